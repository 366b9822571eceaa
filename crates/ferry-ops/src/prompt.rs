//! Prompts sent from a job's worker to its controller.

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use ferry_core::FileInfo;

/// A response type that can answer a [`Prompt`].
pub trait Response: Copy + PartialEq + Send + 'static {
    /// Every response the controller may choose from.
    const OFFERED: &'static [Self];

    /// The response assumed when a prompt is never answered.
    const CANCEL: Self;
}

/// Answer to "the target already exists, overwrite it?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum OverwriteResponse {
    Yes,
    No,
    Cancel,
}

impl Response for OverwriteResponse {
    const OFFERED: &'static [Self] = &[Self::Yes, Self::No, Self::Cancel];
    const CANCEL: Self = Self::Cancel;
}

/// Answer to "this file failed, skip it?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum SkipResponse {
    Skip,
    Retry,
    Cancel,
}

impl Response for SkipResponse {
    const OFFERED: &'static [Self] = &[Self::Skip, Self::Retry, Self::Cancel];
    const CANCEL: Self = Self::Cancel;
}

/// A question waiting for exactly one answer.
///
/// Dropping a prompt without answering it counts as
/// [`Response::CANCEL`] on the worker side.
#[derive(Debug)]
pub struct Prompt<R> {
    /// Human readable question, naming the affected file.
    pub message: String,
    reply: oneshot::Sender<R>,
}

impl<R: Response> Prompt<R> {
    pub(crate) fn new(message: String) -> (Self, oneshot::Receiver<R>) {
        let (reply, rx) = oneshot::channel();
        (Self { message, reply }, rx)
    }

    /// The responses the controller may pick from.
    pub fn offered(&self) -> &'static [R] {
        R::OFFERED
    }

    /// Answer the prompt.
    pub fn respond(self, response: R) {
        // The worker may already have given up after a cancellation
        let _ = self.reply.send(response);
    }
}

/// Ownership of a list handed to an observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handoff<T> {
    /// The observer took the list.
    Claimed,
    /// The observer declined; the list goes back to the job.
    Unclaimed(T),
}

impl<T> Handoff<T> {
    /// Check if the observer kept the list.
    pub fn is_claimed(&self) -> bool {
        matches!(self, Self::Claimed)
    }
}

/// A listing offered to the controller.
#[derive(Debug)]
pub struct FilesReady {
    pub files: Vec<FileInfo>,
    pub(crate) reply: oneshot::Sender<Handoff<Vec<FileInfo>>>,
}

/// What a per-file retry loop does next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Attempt the same file again.
    Retry,
    /// Move on to the next file.
    Next,
    /// Stop processing the batch.
    Abort,
}

impl From<SkipResponse> for Decision {
    fn from(response: SkipResponse) -> Self {
        match response {
            SkipResponse::Retry => Self::Retry,
            SkipResponse::Skip => Self::Next,
            SkipResponse::Cancel => Self::Abort,
        }
    }
}

impl From<OverwriteResponse> for Decision {
    /// `Yes` retries after the caller removed the existing target.
    fn from(response: OverwriteResponse) -> Self {
        match response {
            OverwriteResponse::Yes => Self::Retry,
            OverwriteResponse::No => Self::Next,
            OverwriteResponse::Cancel => Self::Abort,
        }
    }
}
