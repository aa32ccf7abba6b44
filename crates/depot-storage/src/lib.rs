//! Depot Storage Library
//!
//! This crate provides the handler capability every storage backend implements
//! and the backends themselves: local disk, remote slave nodes and S3-compatible
//! object stores. Which handler serves a file is decided by its storage policy;
//! the `factory` module is the only place that branches on the policy kind.
//!
//! # Locators
//!
//! A locator is the backend-specific key a file's bytes live under. Handlers
//! never interpret the logical folder tree; they only see locators.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-remote")]
pub mod remote;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod signing;
pub mod traits;

// Re-export commonly used types
pub use depot_core::PolicyKind;
pub use factory::{DefaultHandlerFactory, HandlerFactory};
#[cfg(feature = "storage-local")]
pub use local::LocalHandler;
#[cfg(feature = "storage-remote")]
pub use remote::RemoteHandler;
#[cfg(feature = "storage-s3")]
pub use s3::S3Handler;
pub use signing::UrlSigner;
pub use traits::{
    BoxedContent, ContentStream, DeleteOutcome, Handler, StorageError, StorageResult,
};
