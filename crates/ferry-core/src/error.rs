//! Error types for scanning and job execution.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::FileRef;

/// Errors that can occur while scanning a directory tree.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The scan was cancelled.
    #[error("Operation interrupted")]
    Interrupted,

    /// The root is not a local file.
    #[error("Cannot scan \"{uri}\" because it is not a local file")]
    NotLocal { uri: String },

    /// Other error.
    #[error("{message}")]
    Other { message: String },
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }

    /// Check if this error reports a cancellation.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Interrupted)
    }
}

/// How an error is handled by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum ErrorClass {
    /// User or system initiated abort; never shown as a failure.
    Cancelled,
    /// The target exists; recoverable through an overwrite prompt.
    AlreadyExists,
    /// Any other per-file failure; recoverable through a skip/retry prompt.
    RecoverablePerFile,
    /// A violated precondition, rejected before a job starts.
    Fatal,
    /// The backend cannot perform the operation at all.
    Unsupported,
}

/// Errors surfaced by jobs and by the launch API.
#[derive(Debug, Error)]
pub enum JobError {
    /// The job was cancelled.
    #[error("Operation was cancelled")]
    Cancelled,

    /// The target already exists.
    #[error("The file \"{}\" already exists", .file.display_name())]
    AlreadyExists { file: FileRef },

    /// An I/O error on a specific file.
    #[error("{file}: {source}")]
    Io {
        file: FileRef,
        #[source]
        source: io::Error,
    },

    /// Pairwise operation with lists of different lengths.
    #[error("Source and target lists differ in length ({sources} vs {targets})")]
    MismatchedLists { sources: usize, targets: usize },

    /// The operation requires at least one file.
    #[error("No files given")]
    EmptyFileList,

    /// Both or neither of user and group were given.
    #[error("Exactly one of user id or group id must be given")]
    InvalidOwnership,

    /// The new name is not usable as a file name.
    #[error("Invalid name \"{name}\": {reason}")]
    InvalidDisplayName { name: String, reason: String },

    /// The operation is not available for this file.
    #[error("{message}")]
    Unsupported { file: FileRef, message: String },

    /// The protection policy forbids touching this file.
    #[error("\"{}\" is protected", .file.display_name())]
    Protected { file: FileRef },

    /// The platform trash refused the file.
    #[error("Failed to move \"{}\" to the trash: {message}", .file.display_name())]
    Trash { file: FileRef, message: String },

    /// Collecting files failed.
    #[error(transparent)]
    Scan(ScanError),

    /// The total file count of a job was set twice.
    #[error("Total file count was already set")]
    TotalAlreadySet,

    /// The worker running the job died.
    #[error("Job worker failed: {message}")]
    Worker { message: String },
}

impl JobError {
    /// Create an I/O error with file context.
    pub fn io(file: impl Into<FileRef>, source: io::Error) -> Self {
        let file = file.into();
        match source.kind() {
            io::ErrorKind::AlreadyExists => Self::AlreadyExists { file },
            _ => Self::Io { file, source },
        }
    }

    /// Create an unsupported-operation error.
    pub fn unsupported(file: FileRef, message: impl Into<String>) -> Self {
        Self::Unsupported {
            file,
            message: message.into(),
        }
    }

    /// Classify this error.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Cancelled => ErrorClass::Cancelled,
            Self::AlreadyExists { .. } => ErrorClass::AlreadyExists,
            Self::Io { .. } | Self::Protected { .. } | Self::Trash { .. } => {
                ErrorClass::RecoverablePerFile
            }
            Self::Scan(ScanError::Interrupted) => ErrorClass::Cancelled,
            Self::Scan(ScanError::NotLocal { .. }) | Self::Unsupported { .. } => {
                ErrorClass::Unsupported
            }
            Self::Scan(_) => ErrorClass::RecoverablePerFile,
            Self::MismatchedLists { .. }
            | Self::EmptyFileList
            | Self::InvalidOwnership
            | Self::InvalidDisplayName { .. }
            | Self::TotalAlreadySet
            | Self::Worker { .. } => ErrorClass::Fatal,
        }
    }

    /// Check if this error reports a cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.class() == ErrorClass::Cancelled
    }
}

impl From<ScanError> for JobError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::Interrupted => Self::Cancelled,
            other => Self::Scan(other),
        }
    }
}
