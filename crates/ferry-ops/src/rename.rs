//! Rename operation.

use std::fs;

use tracing::debug;

use ferry_core::{FileRef, JobError};

use crate::job::{JobContext, require_local};

/// Give `file` the name `new_name` within its directory.
///
/// The name was validated at launch. An existing entry with that name is
/// never replaced.
pub(crate) fn rename(ctx: &mut JobContext, file: FileRef, new_name: String) -> Result<(), JobError> {
    ctx.set_total(1)?;
    ctx.advance(&file);

    if ctx.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    let source = require_local(&file, "rename")?;
    let parent = source.parent().unwrap_or(std::path::Path::new(""));
    let new_path = parent.join(&new_name);

    // Check if target already exists
    if new_path != source && fs::symlink_metadata(&new_path).is_ok() {
        return Err(JobError::AlreadyExists {
            file: FileRef::Local(new_path),
        });
    }

    fs::rename(source, &new_path).map_err(|e| JobError::io(file.clone(), e))?;
    debug!(from = %source.display(), to = %new_path.display(), "Renamed");

    ctx.emit_renamed(file.clone(), FileRef::Local(new_path));
    Ok(())
}
