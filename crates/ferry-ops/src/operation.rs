//! File operation types.

use serde::{Deserialize, Serialize};

use ferry_core::{FileList, FileRef, JobError, Ownership, PermissionSpec};

/// A file operation to be executed as a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileOperation {
    /// Create new empty files.
    Create { files: FileList },
    /// Create new directories.
    Mkdir { files: FileList },
    /// Delete files and directories recursively.
    Unlink { files: FileList },
    /// Create a symbolic link at each target pointing to its source.
    Link { sources: FileList, targets: FileList },
    /// Move files to the trash.
    Trash { files: FileList },
    /// Move trashed files back to their original locations.
    Restore { sources: FileList, targets: FileList },
    /// Change the owning user or group.
    Chown {
        files: FileList,
        ownership: Ownership,
        recursive: bool,
    },
    /// Change permission bits.
    Chmod {
        files: FileList,
        permissions: PermissionSpec,
        recursive: bool,
    },
    /// List the direct children of a directory.
    List { directory: FileRef },
    /// Move each source to its target.
    Move { sources: FileList, targets: FileList },
    /// Copy each source to its target.
    Copy { sources: FileList, targets: FileList },
    /// Give a single file a new name in the same directory.
    Rename { file: FileRef, new_name: String },
}

/// The kind of a [`FileOperation`], without its arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum OperationKind {
    Create,
    Mkdir,
    Unlink,
    Link,
    Trash,
    Restore,
    Chown,
    Chmod,
    List,
    Move,
    Copy,
    Rename,
}

impl FileOperation {
    /// Create a pairwise move operation.
    pub fn move_to(sources: FileList, targets: FileList) -> Self {
        Self::Move { sources, targets }
    }

    /// Create a pairwise copy operation.
    pub fn copy(sources: FileList, targets: FileList) -> Self {
        Self::Copy { sources, targets }
    }

    /// Create a rename operation.
    pub fn rename(file: FileRef, new_name: impl Into<String>) -> Self {
        Self::Rename {
            file,
            new_name: new_name.into(),
        }
    }

    /// The kind of this operation.
    pub fn kind(&self) -> OperationKind {
        match self {
            Self::Create { .. } => OperationKind::Create,
            Self::Mkdir { .. } => OperationKind::Mkdir,
            Self::Unlink { .. } => OperationKind::Unlink,
            Self::Link { .. } => OperationKind::Link,
            Self::Trash { .. } => OperationKind::Trash,
            Self::Restore { .. } => OperationKind::Restore,
            Self::Chown { .. } => OperationKind::Chown,
            Self::Chmod { .. } => OperationKind::Chmod,
            Self::List { .. } => OperationKind::List,
            Self::Move { .. } => OperationKind::Move,
            Self::Copy { .. } => OperationKind::Copy,
            Self::Rename { .. } => OperationKind::Rename,
        }
    }

    /// Check the preconditions that must hold before a job is started.
    ///
    /// Every error returned here is fatal: the job is never launched.
    pub fn validate(&self) -> Result<(), JobError> {
        match self {
            Self::Link { sources, targets }
            | Self::Restore { sources, targets }
            | Self::Move { sources, targets }
            | Self::Copy { sources, targets } => {
                if sources.len() != targets.len() {
                    return Err(JobError::MismatchedLists {
                        sources: sources.len(),
                        targets: targets.len(),
                    });
                }
                if sources.is_empty() {
                    return Err(JobError::EmptyFileList);
                }
                Ok(())
            }
            Self::Trash { files } if files.is_empty() => Err(JobError::EmptyFileList),
            Self::Rename { new_name, .. } => {
                validate_filename(new_name).map_err(|reason| JobError::InvalidDisplayName {
                    name: new_name.clone(),
                    reason,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Validate a file name for use as a single path component.
pub fn validate_filename(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("Name cannot be empty".into());
    }

    if name.len() > 255 {
        return Err("Name is too long (max 255 bytes)".into());
    }

    for c in ['/', '\0'] {
        if name.contains(c) {
            return Err(format!("Name cannot contain {c:?}"));
        }
    }

    if name == "." || name == ".." {
        return Err("'.' and '..' are reserved names".into());
    }

    Ok(())
}
