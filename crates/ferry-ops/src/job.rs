//! The job abstraction: state, outcome and the worker-side context.

use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use ferry_core::{EngineConfig, FileInfo, FileList, FileRef, JobError};
use ferry_scan::CancelToken;

use crate::policy::ProtectionPolicy;
use crate::progress::JobProgress;
use crate::prompt::{FilesReady, Handoff, OverwriteResponse, Prompt, Response, SkipResponse};

/// Identifier of a job, unique per runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lifecycle state of a job.
///
/// `Succeeded`, `Failed` and `Cancelled` are terminal: once reached, the
/// state never changes again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[repr(u8)]
pub enum JobState {
    Pending = 0,
    Running = 1,
    Succeeded = 2,
    Failed = 3,
    Cancelled = 4,
}

impl JobState {
    /// Check if this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Running,
            2 => Self::Succeeded,
            3 => Self::Failed,
            _ => Self::Cancelled,
        }
    }
}

/// A job state shared between the worker and the handle.
#[derive(Debug)]
pub(crate) struct SharedState(AtomicU8);

impl SharedState {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(JobState::Pending as u8))
    }

    pub(crate) fn get(&self) -> JobState {
        JobState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from `from` to `to`; fails if the state is no longer `from`.
    pub(crate) fn transition(&self, from: JobState, to: JobState) -> bool {
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Enter a terminal state unless one was already reached.
    pub(crate) fn finish(&self, to: JobState) -> bool {
        self.transition(JobState::Running, to) || self.transition(JobState::Pending, to)
    }
}

/// The final result of a job, delivered exactly once.
#[derive(Debug)]
pub enum JobOutcome {
    Succeeded,
    Failed(JobError),
    Cancelled,
}

impl JobOutcome {
    /// Derive the outcome from what the operation returned.
    ///
    /// A cancelled token wins over everything else, so an operation that
    /// bailed out with an I/O error after the user cancelled still ends
    /// up `Cancelled`.
    pub(crate) fn from_result(result: Result<(), JobError>, token: &CancelToken) -> Self {
        match result {
            Err(err) if err.is_cancelled() => Self::Cancelled,
            _ if token.is_cancelled() => Self::Cancelled,
            Ok(()) => Self::Succeeded,
            Err(err) => Self::Failed(err),
        }
    }

    /// The terminal state matching this outcome.
    pub fn state(&self) -> JobState {
        match self {
            Self::Succeeded => JobState::Succeeded,
            Self::Failed(_) => JobState::Failed,
            Self::Cancelled => JobState::Cancelled,
        }
    }

    /// Check if the job succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed(err) => write!(f, "Failed: {err}"),
            Self::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// Messages from a worker to its controller.
#[derive(Debug)]
pub(crate) enum JobEvent {
    Progress(JobProgress),
    AskOverwrite(Prompt<OverwriteResponse>),
    AskSkip(Prompt<SkipResponse>),
    InfoMessage {
        text: String,
        ack: oneshot::Sender<()>,
    },
    NewFiles(FileList),
    FilesReady(FilesReady),
    Renamed {
        from: FileRef,
        to: FileRef,
    },
}

/// The worker's view of a running job.
///
/// Every method that talks to the controller blocks the calling thread, so
/// a context must only be used from the job's blocking worker.
pub struct JobContext {
    id: JobId,
    token: CancelToken,
    events: mpsc::Sender<JobEvent>,
    progress: JobProgress,
    total_set: bool,
    advanced: u64,
    config: EngineConfig,
    policy: Arc<dyn ProtectionPolicy>,
}

impl JobContext {
    pub(crate) fn new(
        id: JobId,
        token: CancelToken,
        events: mpsc::Sender<JobEvent>,
        config: EngineConfig,
        policy: Arc<dyn ProtectionPolicy>,
    ) -> Self {
        Self {
            id,
            token,
            events,
            progress: JobProgress::default(),
            total_set: false,
            advanced: 0,
            config,
            policy,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn token(&self) -> &CancelToken {
        &self.token
    }

    /// Check whether the job was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn policy(&self) -> &dyn ProtectionPolicy {
        self.policy.as_ref()
    }

    /// The progress reported so far.
    pub fn progress(&self) -> &JobProgress {
        &self.progress
    }

    /// Fix the number of items the job will process.
    ///
    /// May only be called once per job.
    pub fn set_total(&mut self, total: usize) -> Result<(), JobError> {
        if self.total_set {
            return Err(JobError::TotalAlreadySet);
        }
        self.total_set = true;
        self.progress.total = total as u64;
        Ok(())
    }

    /// Set the number of bytes the job will transfer.
    pub fn set_total_bytes(&mut self, bytes: u64) {
        self.progress.bytes_total = bytes;
    }

    /// Record transferred bytes and report progress.
    pub fn add_bytes(&mut self, bytes: u64) {
        let done = self.progress.bytes_done.saturating_add(bytes);
        self.progress.bytes_done = if self.progress.bytes_total > 0 {
            done.min(self.progress.bytes_total)
        } else {
            done
        };
        self.send(JobEvent::Progress(self.progress.clone()));
    }

    /// Report that processing of `current` starts now.
    ///
    /// The processed count is the number of items started before this one,
    /// never more than the total.
    pub fn advance(&mut self, current: &FileRef) {
        self.progress.processed = self.advanced.min(self.progress.total);
        self.progress.current = Some(current.clone());
        self.advanced += 1;
        self.send(JobEvent::Progress(self.progress.clone()));
    }

    /// Ask whether an existing target may be overwritten.
    pub fn ask_overwrite(&self, message: impl Into<String>) -> OverwriteResponse {
        self.ask(message.into(), JobEvent::AskOverwrite)
    }

    /// Ask whether a failed file may be skipped.
    pub fn ask_skip(&self, message: impl Into<String>) -> SkipResponse {
        self.ask(message.into(), JobEvent::AskSkip)
    }

    fn ask<R: Response>(&self, message: String, wrap: fn(Prompt<R>) -> JobEvent) -> R {
        if self.is_cancelled() {
            return R::CANCEL;
        }

        debug!(job = %self.id, %message, "Asking controller");

        let (prompt, reply) = Prompt::new(message);
        if self.events.blocking_send(wrap(prompt)).is_err() {
            self.token.cancel();
            return R::CANCEL;
        }

        // An unanswered prompt counts as cancel
        let response = reply.blocking_recv().unwrap_or(R::CANCEL);

        if self.is_cancelled() {
            return R::CANCEL;
        }
        if response == R::CANCEL {
            self.token.cancel();
        }
        response
    }

    /// Show an informational message and wait until it was delivered.
    pub fn info_message(&self, text: impl Into<String>) {
        let (ack, delivered) = oneshot::channel();
        if self
            .events
            .blocking_send(JobEvent::InfoMessage {
                text: text.into(),
                ack,
            })
            .is_ok()
        {
            let _ = delivered.blocking_recv();
        }
    }

    /// Report files the job created.
    pub fn emit_new_files(&self, files: FileList) {
        if !files.is_empty() {
            self.send(JobEvent::NewFiles(files));
        }
    }

    /// Offer a listing to the controller.
    ///
    /// Returns true if the controller claimed it. An unclaimed listing comes
    /// back to the job and is dropped here.
    pub fn emit_files_ready(&self, files: Vec<FileInfo>) -> bool {
        let (reply, handoff) = oneshot::channel();
        if self
            .events
            .blocking_send(JobEvent::FilesReady(FilesReady { files, reply }))
            .is_err()
        {
            return false;
        }

        match handoff.blocking_recv() {
            Ok(Handoff::Claimed) => true,
            Ok(Handoff::Unclaimed(files)) => {
                drop(files);
                false
            }
            Err(_) => false,
        }
    }

    /// Report that `from` was renamed to `to`.
    pub fn emit_renamed(&self, from: FileRef, to: FileRef) {
        self.send(JobEvent::Renamed { from, to });
    }

    fn send(&self, event: JobEvent) {
        // A closed channel means nobody drives the job any more
        if self.events.blocking_send(event).is_err() {
            self.token.cancel();
        }
    }
}

/// The local path of `file`, or an unsupported-operation error.
pub(crate) fn require_local<'a>(file: &'a FileRef, action: &str) -> Result<&'a Path, JobError> {
    file.local_path().ok_or_else(|| {
        JobError::unsupported(
            file.clone(),
            format!(
                "Could not {action} \"{}\" because it is not a local file",
                file.display_name()
            ),
        )
    })
}
