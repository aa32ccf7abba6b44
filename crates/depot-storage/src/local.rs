use crate::signing::UrlSigner;
use crate::traits::{BoxedContent, DeleteOutcome, Handler, StorageError, StorageResult};
use async_trait::async_trait;
use depot_core::models::UploadSession;
use depot_core::PolicyKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Local filesystem handler
#[derive(Clone)]
pub struct LocalHandler {
    base_path: PathBuf,
    base_url: String,
    signer: UrlSigner,
}

impl LocalHandler {
    /// Create a new LocalHandler instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory locators are resolved against (e.g., "/var/lib/depot/uploads")
    /// * `base_url` - Public site URL signed links point at (e.g., "http://localhost:5212")
    /// * `signer` - Signs the links this handler issues
    pub async fn new(
        base_path: impl Into<PathBuf>,
        base_url: String,
        signer: UrlSigner,
    ) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalHandler {
            base_path,
            base_url,
            signer,
        })
    }

    /// Convert a locator to a filesystem path with security validation
    ///
    /// Relative locators resolve against the base directory. Absolute ones
    /// (physical paths) are accepted only when they lie under it. Traversal
    /// sequences and paths resolving outside the base directory are rejected.
    fn key_to_path(&self, locator: &str) -> StorageResult<PathBuf> {
        if locator.is_empty() || locator.contains("..") {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let base_canonical = self.base_path.canonicalize().map_err(|e| {
            StorageError::ConfigError(format!("Failed to canonicalize base path: {}", e))
        })?;

        let candidate = Path::new(locator);
        let path = if candidate.is_absolute() {
            if !candidate.starts_with(&self.base_path) && !candidate.starts_with(&base_canonical) {
                return Err(StorageError::InvalidKey(
                    "Physical path is outside storage directory".to_string(),
                ));
            }
            candidate.to_path_buf()
        } else {
            self.base_path.join(locator)
        };

        if let Ok(canonical) = path.canonicalize() {
            if canonical.strip_prefix(&base_canonical).is_err() {
                return Err(StorageError::InvalidKey(
                    "Storage key resolves outside storage directory".to_string(),
                ));
            }
        }

        Ok(path)
    }

    /// Path component of a signed link, before the signature is appended
    fn link_path(locator: &str, is_download: bool) -> String {
        let action = if is_download { "download" } else { "get" };
        format!(
            "/api/v3/file/{}/{}",
            action,
            urlencoding::encode(locator)
        )
    }

    pub fn signer(&self) -> &UrlSigner {
        &self.signer
    }
}

#[async_trait]
impl Handler for LocalHandler {
    async fn get(&self, locator: &str) -> StorageResult<BoxedContent> {
        let path = self.key_to_path(locator)?;

        let file = fs::File::open(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(locator.to_string())
            } else {
                StorageError::DownloadFailed(format!(
                    "Failed to open file {}: {}",
                    path.display(),
                    e
                ))
            }
        })?;

        tracing::debug!(path = %path.display(), key = %locator, "Local file opened");

        Ok(Box::new(file))
    }

    async fn delete(&self, locators: &[String]) -> DeleteOutcome {
        let start = std::time::Instant::now();
        let mut outcome = DeleteOutcome::success();

        for locator in locators {
            let path = match self.key_to_path(locator) {
                Ok(path) => path,
                Err(e) => {
                    outcome.failed.push(locator.clone());
                    outcome.error = Some(e);
                    continue;
                }
            };

            if !fs::try_exists(&path).await.unwrap_or(false) {
                continue;
            }

            if let Err(e) = fs::remove_file(&path).await {
                tracing::warn!(
                    error = %e,
                    path = %path.display(),
                    key = %locator,
                    "Failed to delete local file"
                );
                outcome.failed.push(locator.clone());
                outcome.error = Some(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        tracing::info!(
            requested = locators.len(),
            failed = outcome.failed.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage batch delete finished"
        );

        outcome
    }

    async fn source(
        &self,
        locator: &str,
        ttl: Option<Duration>,
        is_download: bool,
        _speed_limit: u64,
    ) -> StorageResult<String> {
        self.key_to_path(locator)?;

        let path = Self::link_path(locator, is_download);
        let sign = self.signer.sign_for(&path, ttl)?;

        Ok(format!(
            "{}{}?sign={}",
            self.base_url.trim_end_matches('/'),
            path,
            urlencoding::encode(&sign)
        ))
    }

    async fn cancel_token(&self, session: &UploadSession) -> StorageResult<()> {
        // Local uploads hold no backend-side session; the partial file is
        // removed together with the file's other locators.
        tracing::debug!(session = %session.key, "Local upload session needs no cancellation");
        Ok(())
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Local
    }
}
