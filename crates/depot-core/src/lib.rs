//! Depot Core Library
//!
//! This crate provides the domain models, configuration and error metadata
//! shared by every Depot component: file and folder records, storage policies,
//! users and their groups, cached upload sessions and listing objects.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{DeleteErrorMode, DepotConfig, ExecutionMode};
pub use error::{error_chain, ErrorMetadata, LogLevel};
pub use storage_types::PolicyKind;
// Note: Handler, StorageError and the content stream types live in depot-storage.
