//! Create empty files and directories.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use ferry_core::{FileList, JobError};

use crate::job::{JobContext, require_local};
use crate::prompt::{Decision, OverwriteResponse};

/// What to create for each path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CreateKind {
    File,
    Directory,
}

impl CreateKind {
    fn create(self, path: &Path) -> io::Result<()> {
        match self {
            Self::File => OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(path)
                .map(drop),
            Self::Directory => fs::create_dir(path),
        }
    }

    fn failure(self) -> &'static str {
        match self {
            Self::File => "Failed to create empty file",
            Self::Directory => "Failed to create directory",
        }
    }
}

/// Create every file in `files`, asking before replacing existing entries.
///
/// Files that already exist and are not overwritten, and files skipped
/// after an error, are left out of the reported new files.
pub(crate) fn create(ctx: &mut JobContext, files: FileList, kind: CreateKind) -> Result<(), JobError> {
    ctx.set_total(files.len())?;

    let mut created = FileList::with_capacity(files.len());

    for file in files {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        ctx.advance(&file);

        let path = require_local(&file, "create")?;

        let decision = loop {
            let err = match kind.create(path) {
                Ok(()) => {
                    debug!(path = %path.display(), ?kind, "Created");
                    created.push(file.clone());
                    break Decision::Next;
                }
                Err(err) => err,
            };

            if ctx.is_cancelled() {
                break Decision::Abort;
            }

            let name = file.display_name();

            if err.kind() == io::ErrorKind::AlreadyExists {
                match ctx.ask_overwrite(format!("The file \"{name}\" already exists")) {
                    OverwriteResponse::Yes => {
                        // A target that cannot be removed fails the job
                        remove_existing(path).map_err(|e| JobError::io(file.clone(), e))?;
                        continue;
                    }
                    response => break Decision::from(response),
                }
            }

            warn!(path = %path.display(), error = %err, "Create failed");
            match Decision::from(ctx.ask_skip(format!("{} \"{name}\": {err}", kind.failure()))) {
                Decision::Retry => continue,
                decision => break decision,
            }
        };

        if decision == Decision::Abort {
            return Err(JobError::Cancelled);
        }
    }

    if ctx.is_cancelled() {
        return Err(JobError::Cancelled);
    }

    ctx.emit_new_files(created);
    Ok(())
}

/// Remove an existing entry so it can be created again.
///
/// Directories are only removed when empty.
pub(crate) fn remove_existing(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    }
}
