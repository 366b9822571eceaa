//! Job engine for ferry.
//!
//! Every file operation runs as a job on a blocking worker thread. The
//! worker reports progress and asks questions through a bounded channel;
//! the controller drains that channel in [`JobHandle::run`] and answers
//! through a [`JobObserver`]. Prompts block the worker until they are
//! answered, so a job never races ahead of its controller.
//!
//! # Example
//!
//! ```rust,no_run
//! use ferry_ops::{FileRef, JobObserver, JobRunner, OverwriteResponse, SkipResponse};
//!
//! struct Decline;
//!
//! impl JobObserver for Decline {
//!     fn on_ask_overwrite(&mut self, _message: &str) -> OverwriteResponse {
//!         OverwriteResponse::No
//!     }
//!
//!     fn on_ask_skip(&mut self, _message: &str) -> SkipResponse {
//!         SkipResponse::Skip
//!     }
//! }
//!
//! # async fn demo() {
//! let runner = JobRunner::default();
//! let handle = runner
//!     .launch_copy(vec![FileRef::local("/tmp/a")], vec![FileRef::local("/tmp/b")])
//!     .unwrap();
//! let outcome = handle.run(&mut Decline).await;
//! println!("{outcome}");
//! # }
//! ```

mod attrs;
mod create;
mod job;
mod link;
mod list;
mod observer;
mod operation;
mod policy;
mod progress;
mod prompt;
mod rename;
mod runner;
mod transfer;
mod trash;
mod unlink;

pub use job::{JobContext, JobId, JobOutcome, JobState};
pub use observer::JobObserver;
pub use operation::{FileOperation, OperationKind, validate_filename};
pub use policy::{ProtectedPaths, ProtectionPolicy, Unprotected};
pub use progress::JobProgress;
pub use prompt::{Decision, Handoff, OverwriteResponse, Prompt, Response, SkipResponse};
pub use runner::{JobHandle, JobRunner};

// Re-export the shared data model
pub use ferry_core::{
    EngineConfig, EntryKind, ErrorClass, FileInfo, FileList, FileRef, JobError, ModeChange,
    Ownership, PermissionSpec,
};
pub use ferry_scan::CancelToken;
