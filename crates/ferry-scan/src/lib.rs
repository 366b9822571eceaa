//! Cancellable directory scanning for ferry.
//!
//! This crate provides the two leaf components of the job engine:
//!
//! - [`CancelToken`], a lock-free cancellation flag with an optional deadline
//! - [`Scanner`], a serial jwalk walk that produces child-before-parent lists
//!
//! # Example
//!
//! ```rust,no_run
//! use ferry_core::FileRef;
//! use ferry_scan::{CancelToken, Scanner};
//!
//! let token = CancelToken::new();
//! let root = FileRef::local("/path/to/dir");
//! let files = Scanner::scan(&root, false, true, &token).unwrap();
//!
//! // Every entry comes before its parent directory, so this order is safe
//! // for deletion.
//! for file in &files {
//!     println!("{file}");
//! }
//! ```

mod cancel;
mod scanner;

pub use cancel::CancelToken;
pub use scanner::Scanner;

// Re-export core types for convenience
pub use ferry_core::{FileRef, ScanError};
