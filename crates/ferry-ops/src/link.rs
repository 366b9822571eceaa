//! Symbolic link creation.

use std::io;
use std::path::Path;

use tracing::debug;

use ferry_core::{FileList, JobError};

use crate::create::remove_existing;
use crate::job::{JobContext, require_local};
use crate::prompt::OverwriteResponse;

/// Create a symbolic link at `targets[i]` pointing to `sources[i]`.
///
/// Sources that were linked are reported as new files, but only if the
/// whole job succeeds.
pub(crate) fn link(ctx: &mut JobContext, sources: FileList, targets: FileList) -> Result<(), JobError> {
    ctx.set_total(sources.len())?;

    let mut linked = FileList::new();

    for (source, target) in sources.into_iter().zip(targets) {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        ctx.advance(&source);

        let Some(source_path) = source.local_path() else {
            return Err(JobError::unsupported(
                source.clone(),
                format!(
                    "Could not create symbolic link to \"{}\" because it is not a local file",
                    source.display_name()
                ),
            ));
        };
        let target_path = require_local(&target, "create a link at")?;

        loop {
            match symlink(source_path, target_path) {
                Ok(()) => {
                    debug!(source = %source_path.display(), target = %target_path.display(), "Linked");
                    linked.push(source.clone());
                    break;
                }
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    let message = format!("The file \"{}\" already exists", target.display_name());
                    match ctx.ask_overwrite(message) {
                        OverwriteResponse::Yes => {
                            remove_existing(target_path).map_err(|e| JobError::io(target.clone(), e))?;
                        }
                        OverwriteResponse::No => break,
                        OverwriteResponse::Cancel => return Err(JobError::Cancelled),
                    }
                }
                Err(err) => return Err(JobError::io(target.clone(), err)),
            }
        }
    }

    if ctx.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    ctx.emit_new_files(linked);
    Ok(())
}

#[cfg(unix)]
pub(crate) fn symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
pub(crate) fn symlink(source: &Path, target: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}
