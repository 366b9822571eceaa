//! Directory listing.

use std::{fs, io};

use tracing::debug;

use ferry_core::{FileInfo, FileRef, JobError};
use ferry_scan::Scanner;

use crate::job::{JobContext, require_local};

/// Read the direct children of `directory` and offer them to the
/// controller, sorted by name.
pub(crate) fn list(ctx: &mut JobContext, directory: FileRef) -> Result<(), JobError> {
    if ctx.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    let path = require_local(&directory, "list")?;
    let metadata = fs::metadata(path).map_err(|e| JobError::io(directory.clone(), e))?;
    if !metadata.is_dir() {
        return Err(JobError::io(
            directory.clone(),
            io::Error::from(io::ErrorKind::NotADirectory),
        ));
    }

    let children = Scanner::scan(&directory, false, false, ctx.token())?;

    let mut infos = Vec::with_capacity(children.len());
    for child in children {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let path = require_local(&child, "list")?;
        let info = FileInfo::query(path).map_err(|e| JobError::io(child.clone(), e))?;
        infos.push(info);
    }

    infos.sort_by(|a, b| a.name.cmp(&b.name));

    if !infos.is_empty() {
        let count = infos.len();
        let claimed = ctx.emit_files_ready(infos);
        debug!(count, claimed, "Listing delivered");
    }

    if ctx.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    Ok(())
}
