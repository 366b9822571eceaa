//! Core types for ferry.
//!
//! This crate provides the data model shared by the scanner, the job engine
//! and the CLI: file references, listing records, permission and ownership
//! changes, error types and engine configuration.

mod config;
mod error;
mod file_ref;
mod info;
mod mode;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{ErrorClass, JobError, ScanError};
pub use file_ref::{FileList, FileRef};
pub use info::{EntryKind, FileInfo};
pub use mode::{ModeChange, Ownership, PERMISSION_BITS, PermissionSpec};
