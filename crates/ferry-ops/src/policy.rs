//! Protection of files that must not be deleted or moved away.

use dashmap::DashSet;

use ferry_core::FileRef;

/// Decides whether a file may be removed from its location.
///
/// Consulted by unlink, trash and move before touching a source.
pub trait ProtectionPolicy: Send + Sync {
    fn is_protected(&self, file: &FileRef) -> bool;
}

/// A policy that protects nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unprotected;

impl ProtectionPolicy for Unprotected {
    fn is_protected(&self, _file: &FileRef) -> bool {
        false
    }
}

/// An in-memory set of protected files.
///
/// A file is protected if it, or any directory containing it, is in the
/// set. The set can be changed while jobs are running.
#[derive(Debug, Default)]
pub struct ProtectedPaths {
    files: DashSet<FileRef>,
}

impl ProtectedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protect `file` and everything below it.
    pub fn add(&self, file: FileRef) -> bool {
        self.files.insert(file)
    }

    /// Stop protecting `file`.
    pub fn remove(&self, file: &FileRef) -> bool {
        self.files.remove(file).is_some()
    }

    /// Check if `file` itself was added, ignoring its ancestors.
    pub fn is_protected_directly(&self, file: &FileRef) -> bool {
        self.files.contains(file)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FromIterator<FileRef> for ProtectedPaths {
    fn from_iter<I: IntoIterator<Item = FileRef>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl ProtectionPolicy for ProtectedPaths {
    fn is_protected(&self, file: &FileRef) -> bool {
        let mut current = Some(file.clone());
        while let Some(candidate) = current {
            if self.is_protected_directly(&candidate) {
                return true;
            }
            current = candidate.parent();
        }
        false
    }
}
