//! Controller-side callbacks.

use ferry_core::{FileInfo, FileList, FileRef};

use crate::job::JobOutcome;
use crate::progress::JobProgress;
use crate::prompt::{Handoff, OverwriteResponse, SkipResponse};

/// Receives the notifications of a job on the controller task.
///
/// Callbacks are invoked in the order the worker issued them, never on the
/// worker itself. Prompts must be answered synchronously; while a prompt
/// callback runs, the worker is blocked waiting for its answer.
pub trait JobObserver {
    fn on_progress(&mut self, _progress: &JobProgress) {}

    /// Decide whether an existing target may be overwritten.
    fn on_ask_overwrite(&mut self, message: &str) -> OverwriteResponse;

    /// Decide how to continue after a per-file failure.
    fn on_ask_skip(&mut self, message: &str) -> SkipResponse;

    fn on_info_message(&mut self, _text: &str) {}

    fn on_new_files(&mut self, _files: FileList) {}

    /// Take ownership of a listing, or hand it back.
    fn on_files_ready(&mut self, files: Vec<FileInfo>) -> Handoff<Vec<FileInfo>> {
        Handoff::Unclaimed(files)
    }

    fn on_renamed(&mut self, _from: &FileRef, _to: &FileRef) {}

    fn on_finished(&mut self, _outcome: &JobOutcome) {}
}
