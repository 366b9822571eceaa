//! Recursive deletion.

use tracing::{debug, info, warn};

use ferry_core::{FileList, JobError};
use ferry_scan::Scanner;

use crate::create::remove_existing;
use crate::job::{JobContext, require_local};
use crate::prompt::Decision;

/// Delete `files` and everything below them.
///
/// Entries are removed children first. Filesystem roots are never deleted.
pub(crate) fn unlink(ctx: &mut JobContext, files: FileList) -> Result<(), JobError> {
    ctx.info_message("Preparing...");

    let entries = match Scanner::collect(&files, ctx.token()) {
        Ok(entries) => entries,
        Err(err) if err.is_interrupted() => {
            info!("Cancelled while collecting files to delete");
            return Err(JobError::Cancelled);
        }
        Err(err) => return Err(err.into()),
    };

    ctx.set_total(entries.len())?;

    for entry in entries {
        if ctx.is_cancelled() {
            break;
        }

        ctx.advance(&entry);

        if entry.is_root() {
            debug!(%entry, "Skipping filesystem root");
            continue;
        }

        let path = require_local(&entry, "delete")?;

        let decision = loop {
            let reason = if ctx.policy().is_protected(&entry) {
                "the file is protected".to_string()
            } else {
                match remove_existing(path) {
                    Ok(()) => {
                        debug!(path = %path.display(), "Deleted");
                        break Decision::Next;
                    }
                    Err(err) => err.to_string(),
                }
            };

            if ctx.is_cancelled() {
                break Decision::Abort;
            }

            warn!(path = %path.display(), %reason, "Delete failed");
            let name = entry.display_name();
            match Decision::from(ctx.ask_skip(format!("Could not delete file \"{name}\": {reason}"))) {
                Decision::Retry => continue,
                decision => break decision,
            }
        };

        if decision == Decision::Abort {
            break;
        }
    }

    if ctx.is_cancelled() {
        info!("Cancelled while deleting files");
        return Err(JobError::Cancelled);
    }

    Ok(())
}
