//! JWalk-based post-order directory scanner.

use std::fs;
use std::path::{Path, PathBuf};

use jwalk::{Parallelism, WalkDir};
use tracing::debug;

use ferry_core::{FileRef, ScanError};

use crate::cancel::CancelToken;

/// Recursive directory enumeration in child-before-parent order.
///
/// The walk is serial and sorted by file name, so results are
/// deterministic. jwalk produces entries in pre-order; reversing that
/// sequence lists every entry before its parent directory, which is the
/// order deletion needs.
pub struct Scanner;

impl Scanner {
    /// List all descendants of `root`, each one before its parent directory.
    ///
    /// `root` itself is not part of the result. A root that is not a
    /// directory has no descendants. When `recursive` is false only the
    /// direct children are listed.
    ///
    /// The first I/O error aborts the walk. On cancellation everything
    /// collected so far is dropped and [`ScanError::Interrupted`] is
    /// returned.
    pub fn scan(
        root: &FileRef,
        follow_symlinks: bool,
        recursive: bool,
        token: &CancelToken,
    ) -> Result<Vec<FileRef>, ScanError> {
        let path = local_root(root)?;

        if token.is_cancelled() {
            return Err(ScanError::Interrupted);
        }

        let metadata = if follow_symlinks {
            fs::metadata(path)
        } else {
            fs::symlink_metadata(path)
        }
        .map_err(|e| ScanError::io(path, e))?;

        if !metadata.is_dir() {
            return Ok(Vec::new());
        }

        let mut files: Vec<FileRef> = walk(path, follow_symlinks, recursive, token)?
            .into_iter()
            .map(FileRef::Local)
            .collect();
        files.reverse();

        debug!(root = %path.display(), entries = files.len(), "Scanned directory");
        Ok(files)
    }

    /// Expand `roots` recursively without following symlinks.
    ///
    /// For every root the result holds its descendants followed by the root
    /// itself. Filesystem roots such as `/` are listed but never descended
    /// into.
    pub fn collect(roots: &[FileRef], token: &CancelToken) -> Result<Vec<FileRef>, ScanError> {
        let mut files = Vec::new();

        for root in roots {
            if token.is_cancelled() {
                return Err(ScanError::Interrupted);
            }

            if !root.is_root() {
                files.extend(Self::scan(root, false, true, token)?);
            }
            files.push(root.clone());
        }

        if token.is_cancelled() {
            return Err(ScanError::Interrupted);
        }

        Ok(files)
    }
}

fn local_root(root: &FileRef) -> Result<&Path, ScanError> {
    root.local_path().ok_or_else(|| ScanError::NotLocal {
        uri: root.to_string(),
    })
}

/// Walk `root` in pre-order, returning every entry below it.
fn walk(
    root: &Path,
    follow_symlinks: bool,
    recursive: bool,
    token: &CancelToken,
) -> Result<Vec<PathBuf>, ScanError> {
    let hook_token = token.clone();

    let walker = WalkDir::new(root)
        .parallelism(Parallelism::Serial)
        .sort(true)
        .skip_hidden(false)
        .follow_links(follow_symlinks)
        .min_depth(1)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .process_read_dir(move |_depth, _path, _state, children| {
            // Stop descending as soon as cancellation is observed
            if hook_token.is_cancelled() {
                children.clear();
            }
        });

    let mut entries = Vec::new();

    for entry_result in walker {
        if token.is_cancelled() {
            return Err(ScanError::Interrupted);
        }

        match entry_result {
            Ok(entry) => entries.push(entry.path()),
            Err(err) => {
                let path = err
                    .path()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| root.to_path_buf());
                let scan_error = match err.into_io_error() {
                    Some(io_err) => ScanError::io(path, io_err),
                    None => ScanError::Other {
                        message: format!("Filesystem loop detected at {}", path.display()),
                    },
                };
                return Err(scan_error);
            }
        }
    }

    if token.is_cancelled() {
        return Err(ScanError::Interrupted);
    }

    Ok(entries)
}
