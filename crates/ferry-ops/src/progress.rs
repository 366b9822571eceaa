//! Progress reporting types for jobs.

use serde::{Deserialize, Serialize};

use ferry_core::FileRef;

/// Progress information for a running job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobProgress {
    /// Number of items completed.
    pub processed: u64,
    /// Total number of items (0 until the job knows it).
    pub total: u64,
    /// The item currently being processed.
    pub current: Option<FileRef>,
    /// Number of bytes transferred so far.
    pub bytes_done: u64,
    /// Total bytes to transfer (0 for operations that move no data).
    pub bytes_total: u64,
}

impl JobProgress {
    /// Get the progress as a percentage (0.0 to 100.0).
    pub fn percentage(&self) -> f64 {
        if self.bytes_total > 0 {
            (self.bytes_done as f64 / self.bytes_total as f64) * 100.0
        } else if self.total > 0 {
            (self.processed as f64 / self.total as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Check if the total item count is known.
    pub fn has_total(&self) -> bool {
        self.total > 0
    }
}
