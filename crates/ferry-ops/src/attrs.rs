//! Ownership and permission changes.

use std::fs::{self, Metadata};
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use ferry_core::{FileList, FileRef, JobError, Ownership, PermissionSpec};
use ferry_scan::Scanner;

use crate::job::{JobContext, require_local};
use crate::prompt::Decision;

/// Change the owner or group of `files`, optionally recursing.
pub(crate) fn chown(
    ctx: &mut JobContext,
    files: FileList,
    ownership: Ownership,
    recursive: bool,
) -> Result<(), JobError> {
    for_each_entry(ctx, files, recursive, |path, _metadata| {
        set_owner(path, ownership).map_err(|err| {
            format!(
                "Failed to change the {} of \"{}\": {err}",
                ownership.axis(),
                FileRef::from(path).display_name()
            )
        })
    })
}

/// Change the permission bits of `files`, optionally recursing.
///
/// Directories get the directory change, everything else the file change.
/// Symlinks have no permission bits of their own and are passed over.
pub(crate) fn chmod(
    ctx: &mut JobContext,
    files: FileList,
    permissions: PermissionSpec,
    recursive: bool,
) -> Result<(), JobError> {
    for_each_entry(ctx, files, recursive, |path, metadata| {
        if metadata.file_type().is_symlink() {
            debug!(path = %path.display(), "Skipping symlink");
            return Ok(());
        }

        let new_mode = permissions.apply(mode_bits(metadata), metadata.is_dir());
        set_mode(path, new_mode).map_err(|err| {
            format!(
                "Failed to change the permissions of \"{}\": {err}",
                FileRef::from(path).display_name()
            )
        })
    })
}

/// Expand `files` if asked, then apply `change` to every entry.
///
/// `change` returns the prompt message on failure. A failed metadata query
/// stops the job.
fn for_each_entry<F>(
    ctx: &mut JobContext,
    files: FileList,
    recursive: bool,
    mut change: F,
) -> Result<(), JobError>
where
    F: FnMut(&Path, &Metadata) -> Result<(), String>,
{
    let entries = if recursive {
        Scanner::collect(&files, ctx.token())?
    } else {
        files
    };

    ctx.set_total(entries.len())?;

    for entry in entries {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        ctx.advance(&entry);

        let path = require_local(&entry, "change")?;
        let metadata = fs::symlink_metadata(path).map_err(|e| JobError::io(entry.clone(), e))?;

        let decision = loop {
            let message = match change(path, &metadata) {
                Ok(()) => break Decision::Next,
                Err(message) => message,
            };

            if ctx.is_cancelled() {
                break Decision::Abort;
            }

            warn!(path = %path.display(), %message, "Attribute change failed");
            match Decision::from(ctx.ask_skip(message)) {
                Decision::Retry => continue,
                decision => break decision,
            }
        };

        if decision == Decision::Abort {
            return Err(JobError::Cancelled);
        }
    }

    Ok(())
}

#[cfg(unix)]
fn mode_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode()
}

#[cfg(not(unix))]
fn mode_bits(metadata: &Metadata) -> u32 {
    if metadata.permissions().readonly() { 0o444 } else { 0o644 }
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn set_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(mode & 0o222 == 0);
    fs::set_permissions(path, permissions)
}

#[cfg(unix)]
fn set_owner(path: &Path, ownership: Ownership) -> io::Result<()> {
    match ownership {
        Ownership::User(uid) => std::os::unix::fs::lchown(path, Some(uid), None),
        Ownership::Group(gid) => std::os::unix::fs::lchown(path, None, Some(gid)),
    }
}

#[cfg(not(unix))]
fn set_owner(_path: &Path, _ownership: Ownership) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "Ownership cannot be changed on this platform",
    ))
}
