//! Listing records handed to observers.

use std::fs::Metadata;
use std::path::Path;
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

use crate::FileRef;

/// The type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
    File,
    Directory,
    Symlink,
    Other,
}

impl EntryKind {
    /// Classify metadata obtained without following symlinks.
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let file_type = metadata.file_type();
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, Self::Directory)
    }
}

/// Information about one directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// The entry itself.
    pub file: FileRef,
    /// Display name of the entry.
    pub name: CompactString,
    /// Entry type (symlinks are not followed).
    pub kind: EntryKind,
    /// Size in bytes.
    pub size: u64,
    /// Unix permission bits, including the setuid/setgid/sticky bits.
    pub mode: u32,
    /// Last modification time, if the platform reports one.
    pub modified: Option<SystemTime>,
}

impl FileInfo {
    /// Build a record from already queried metadata.
    pub fn from_metadata(file: FileRef, metadata: &Metadata) -> Self {
        let name = CompactString::new(file.display_name());
        Self {
            name,
            kind: EntryKind::from_metadata(metadata),
            size: metadata.len(),
            mode: permission_bits(metadata),
            modified: metadata.modified().ok(),
            file,
        }
    }

    /// Query a local path without following symlinks.
    pub fn query(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self::from_metadata(FileRef::from(path), &metadata))
    }

    /// Check if the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & crate::PERMISSION_BITS
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() { 0o444 } else { 0o644 }
}
