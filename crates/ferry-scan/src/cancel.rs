//! Cooperative cancellation.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

/// A shared cancellation flag with an optional deadline.
///
/// Clones observe the same flag. Cancellation is monotonic: once any clone
/// reports `true`, every later check on every clone reports `true` as well.
/// Checks never block and need no runtime, so they are safe in tight loops
/// and inside jwalk callbacks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Create a token that is only cancelled explicitly.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a token that also cancels itself once `timeout` has elapsed.
    pub fn with_deadline(timeout: Duration) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Instant::now().checked_add(timeout),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Check whether cancellation was requested or the deadline passed.
    pub fn is_cancelled(&self) -> bool {
        if self.token.is_cancelled() {
            return true;
        }
        if self.deadline_exceeded() {
            // Latch so later checks skip the clock
            self.cancel();
            return true;
        }
        false
    }

    /// Check whether the deadline, if any, has passed.
    pub fn deadline_exceeded(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// The deadline, if one was set.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}
