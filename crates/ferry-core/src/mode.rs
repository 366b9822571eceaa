//! Permission and ownership changes.

use serde::{Deserialize, Serialize};

use crate::JobError;

/// The valid permission bits: rwx for user/group/other plus setuid, setgid
/// and sticky.
pub const PERMISSION_BITS: u32 = 0o7777;

/// A masked mode update.
///
/// Bits in `mask` are cleared from the old mode, then the bits in `mode`
/// are set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModeChange {
    pub mask: u32,
    pub mode: u32,
}

impl ModeChange {
    /// A change that keeps the old mode.
    pub const KEEP: Self = Self { mask: 0, mode: 0 };

    pub fn new(mask: u32, mode: u32) -> Self {
        Self { mask, mode }
    }

    /// Compute the new mode from the old one.
    ///
    /// The old mode may carry file type bits; they are dropped.
    pub fn apply(&self, old_mode: u32) -> u32 {
        ((old_mode & !self.mask) | self.mode) & PERMISSION_BITS
    }
}

/// Separate mode updates for directories and everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionSpec {
    pub directories: ModeChange,
    pub files: ModeChange,
}

impl PermissionSpec {
    pub fn new(dir_mask: u32, dir_mode: u32, file_mask: u32, file_mode: u32) -> Self {
        Self {
            directories: ModeChange::new(dir_mask, dir_mode),
            files: ModeChange::new(file_mask, file_mode),
        }
    }

    /// Apply the same change to directories and files.
    pub fn uniform(change: ModeChange) -> Self {
        Self {
            directories: change,
            files: change,
        }
    }

    /// Select the change matching an entry type.
    pub fn change_for(&self, is_dir: bool) -> &ModeChange {
        if is_dir { &self.directories } else { &self.files }
    }

    /// Compute the new mode for an entry.
    pub fn apply(&self, old_mode: u32, is_dir: bool) -> u32 {
        self.change_for(is_dir).apply(old_mode)
    }
}

/// The ownership axis to change: either the owning user or the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Ownership {
    User(u32),
    Group(u32),
}

impl Ownership {
    /// Build from optional ids; exactly one must be set.
    pub fn from_ids(uid: Option<u32>, gid: Option<u32>) -> Result<Self, JobError> {
        match (uid, gid) {
            (Some(uid), None) => Ok(Self::User(uid)),
            (None, Some(gid)) => Ok(Self::Group(gid)),
            _ => Err(JobError::InvalidOwnership),
        }
    }

    /// Name of the axis, for messages.
    pub fn axis(&self) -> &'static str {
        match self {
            Self::User(_) => "owner",
            Self::Group(_) => "group",
        }
    }
}
