//! Moving files to the platform trash.

use tracing::debug;

use ferry_core::{FileList, JobError};

use crate::job::{JobContext, require_local};

/// Move every file to the trash. The first failure stops the job.
pub(crate) fn trash(ctx: &mut JobContext, files: FileList) -> Result<(), JobError> {
    if ctx.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    ctx.set_total(files.len())?;

    for file in files {
        ctx.advance(&file);

        let path = require_local(&file, "trash")?;

        if ctx.policy().is_protected(&file) {
            return Err(JobError::Protected { file });
        }

        trash::delete(path).map_err(|e| JobError::Trash {
            file: file.clone(),
            message: e.to_string(),
        })?;

        debug!(path = %path.display(), "Moved to trash");
    }

    Ok(())
}
