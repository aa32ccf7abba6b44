//! Handler capability trait
//!
//! This module defines the Handler trait that all storage backends must implement.

use async_trait::async_trait;
use depot_core::models::UploadSession;
use depot_core::PolicyKind;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncSeek};

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Signing failed: {0}")]
    SignFailed(String),

    #[error("Upload cancellation failed: {0}")]
    CancelFailed(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Readable, seekable byte stream. Dropping it closes the underlying object.
pub trait ContentStream: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> ContentStream for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

/// Owned content stream as returned by [`Handler::get`].
pub type BoxedContent = Box<dyn ContentStream>;

/// Result of a batch delete.
///
/// Backends report partial failure: `failed` lists the requested locators that
/// are still present, `error` carries the last error seen, if any. Both can be
/// set at once.
#[derive(Debug, Default)]
pub struct DeleteOutcome {
    pub failed: Vec<String>,
    pub error: Option<StorageError>,
}

impl DeleteOutcome {
    pub fn success() -> Self {
        Self::default()
    }

    /// Every requested locator failed for the same reason.
    pub fn all_failed(locators: &[String], error: StorageError) -> Self {
        Self {
            failed: locators.to_vec(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty() && self.error.is_none()
    }
}

/// Storage handler capability
///
/// One implementation per backend kind (local disk, slave node, object store).
/// The filesystem layer only ever talks to storage through this trait, so the
/// handler serving a file can be swapped per policy at run time.
///
/// Calls are plain futures: callers that need cancellation race them against a
/// token and drop the loser.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Open the object stored under `locator` for reading.
    async fn get(&self, locator: &str) -> StorageResult<BoxedContent>;

    /// Delete a batch of objects. Missing objects count as deleted.
    async fn delete(&self, locators: &[String]) -> DeleteOutcome;

    /// Build an externally dereferenceable URL for `locator`.
    ///
    /// `ttl = None` asks for a non-expiring link. `speed_limit` (bytes/s, 0 =
    /// unlimited) may be embedded by backends that serve the bytes themselves.
    async fn source(
        &self,
        locator: &str,
        ttl: Option<Duration>,
        is_download: bool,
        speed_limit: u64,
    ) -> StorageResult<String>;

    /// Abort the backend side of an in-flight upload session.
    async fn cancel_token(&self, session: &UploadSession) -> StorageResult<()>;

    /// The backend kind this handler serves.
    fn kind(&self) -> PolicyKind;
}
