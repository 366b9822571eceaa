//! Launching jobs and delivering their events to the controller.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span};

use ferry_core::{EngineConfig, FileList, FileRef, JobError, Ownership, PermissionSpec};
use ferry_scan::CancelToken;

use crate::attrs::{chmod, chown};
use crate::create::{CreateKind, create};
use crate::job::{JobContext, JobEvent, JobId, JobOutcome, JobState, SharedState};
use crate::link::link;
use crate::list::list;
use crate::observer::JobObserver;
use crate::operation::{FileOperation, OperationKind};
use crate::policy::{ProtectionPolicy, Unprotected};
use crate::rename::rename;
use crate::transfer::{TransferMode, transfer};
use crate::trash::trash;
use crate::unlink::unlink;

/// Starts jobs on the blocking thread pool of the current tokio runtime.
///
/// A runner holds the configuration and protection policy shared by all of
/// its jobs. Launch methods must be called from within a tokio runtime.
pub struct JobRunner {
    config: EngineConfig,
    policy: Arc<dyn ProtectionPolicy>,
    next_id: AtomicU64,
}

impl JobRunner {
    /// Create a runner that protects nothing.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            policy: Arc::new(Unprotected),
            next_id: AtomicU64::new(1),
        }
    }

    /// Use `policy` for every job launched from now on.
    pub fn with_policy(mut self, policy: Arc<dyn ProtectionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validate `operation` and start it.
    ///
    /// Fails without starting anything if a precondition does not hold.
    pub fn launch(&self, operation: FileOperation) -> Result<JobHandle, JobError> {
        operation.validate()?;

        let id = JobId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let kind = operation.kind();
        let token = match self.config.job_deadline {
            Some(timeout) => CancelToken::with_deadline(timeout),
            None => CancelToken::new(),
        };
        let state = Arc::new(SharedState::new());
        let (tx, rx) = mpsc::channel(self.config.channel_capacity);

        let mut ctx = JobContext::new(
            id,
            token.clone(),
            tx,
            self.config.clone(),
            Arc::clone(&self.policy),
        );
        let worker_state = Arc::clone(&state);

        let worker = tokio::task::spawn_blocking(move || {
            let span = info_span!("job", id = id.0, %kind);
            let _enter = span.enter();

            worker_state.transition(JobState::Pending, JobState::Running);
            debug!("Job started");

            let result = execute(operation, &mut ctx);
            let outcome = JobOutcome::from_result(result, ctx.token());
            worker_state.finish(outcome.state());

            info!(%outcome, "Job finished");
            outcome
        });

        Ok(JobHandle {
            id,
            kind,
            token,
            state,
            events: rx,
            worker,
        })
    }

    pub fn launch_create(&self, files: FileList) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Create { files })
    }

    pub fn launch_mkdir(&self, files: FileList) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Mkdir { files })
    }

    pub fn launch_unlink(&self, files: FileList) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Unlink { files })
    }

    pub fn launch_link(&self, sources: FileList, targets: FileList) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Link { sources, targets })
    }

    pub fn launch_trash(&self, files: FileList) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Trash { files })
    }

    pub fn launch_restore(
        &self,
        sources: FileList,
        targets: FileList,
    ) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Restore { sources, targets })
    }

    pub fn launch_chown(
        &self,
        files: FileList,
        ownership: Ownership,
        recursive: bool,
    ) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Chown {
            files,
            ownership,
            recursive,
        })
    }

    pub fn launch_chmod(
        &self,
        files: FileList,
        permissions: PermissionSpec,
        recursive: bool,
    ) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Chmod {
            files,
            permissions,
            recursive,
        })
    }

    pub fn launch_list(&self, directory: FileRef) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::List { directory })
    }

    pub fn launch_move(&self, sources: FileList, targets: FileList) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Move { sources, targets })
    }

    pub fn launch_copy(&self, sources: FileList, targets: FileList) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::Copy { sources, targets })
    }

    pub fn launch_rename(
        &self,
        file: FileRef,
        new_name: impl Into<String>,
    ) -> Result<JobHandle, JobError> {
        self.launch(FileOperation::rename(file, new_name))
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

fn execute(operation: FileOperation, ctx: &mut JobContext) -> Result<(), JobError> {
    match operation {
        FileOperation::Create { files } => create(ctx, files, CreateKind::File),
        FileOperation::Mkdir { files } => create(ctx, files, CreateKind::Directory),
        FileOperation::Unlink { files } => unlink(ctx, files),
        FileOperation::Link { sources, targets } => link(ctx, sources, targets),
        FileOperation::Trash { files } => trash(ctx, files),
        FileOperation::Restore { sources, targets } => {
            transfer(ctx, sources, targets, TransferMode::Restore)
        }
        FileOperation::Chown {
            files,
            ownership,
            recursive,
        } => chown(ctx, files, ownership, recursive),
        FileOperation::Chmod {
            files,
            permissions,
            recursive,
        } => chmod(ctx, files, permissions, recursive),
        FileOperation::List { directory } => list(ctx, directory),
        FileOperation::Move { sources, targets } => {
            transfer(ctx, sources, targets, TransferMode::Move)
        }
        FileOperation::Copy { sources, targets } => {
            transfer(ctx, sources, targets, TransferMode::Copy)
        }
        FileOperation::Rename { file, new_name } => rename(ctx, file, new_name),
    }
}

/// The controller's handle on a launched job.
///
/// Events are buffered until [`JobHandle::run`] delivers them. Dropping the
/// handle cancels the job at its next interaction with the controller.
pub struct JobHandle {
    id: JobId,
    kind: OperationKind,
    token: CancelToken,
    state: Arc<SharedState>,
    events: mpsc::Receiver<JobEvent>,
    worker: JoinHandle<JobOutcome>,
}

impl JobHandle {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The current lifecycle state.
    pub fn state(&self) -> JobState {
        self.state.get()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// A token that cancels this job, usable after the handle was consumed.
    pub fn canceller(&self) -> CancelToken {
        self.token.clone()
    }

    /// Deliver every event of the job to `observer` until it finishes.
    ///
    /// Prompts are answered by the observer and sent back to the worker.
    /// `on_finished` is called exactly once, after all other callbacks.
    pub async fn run<O>(mut self, observer: &mut O) -> JobOutcome
    where
        O: JobObserver + ?Sized,
    {
        while let Some(event) = self.events.recv().await {
            dispatch(event, observer);
        }

        let outcome = match self.worker.await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.state.finish(JobState::Failed);
                JobOutcome::Failed(JobError::Worker {
                    message: err.to_string(),
                })
            }
        };

        observer.on_finished(&outcome);
        outcome
    }
}

fn dispatch<O>(event: JobEvent, observer: &mut O)
where
    O: JobObserver + ?Sized,
{
    match event {
        JobEvent::Progress(progress) => observer.on_progress(&progress),
        JobEvent::AskOverwrite(prompt) => {
            let response = observer.on_ask_overwrite(&prompt.message);
            prompt.respond(response);
        }
        JobEvent::AskSkip(prompt) => {
            let response = observer.on_ask_skip(&prompt.message);
            prompt.respond(response);
        }
        JobEvent::InfoMessage { text, ack } => {
            observer.on_info_message(&text);
            let _ = ack.send(());
        }
        JobEvent::NewFiles(files) => observer.on_new_files(files),
        JobEvent::FilesReady(ready) => {
            let handoff = observer.on_files_ready(ready.files);
            let _ = ready.reply.send(handoff);
        }
        JobEvent::Renamed { from, to } => observer.on_renamed(&from, &to),
    }
}
