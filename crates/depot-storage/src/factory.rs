#[cfg(feature = "storage-local")]
use crate::LocalHandler;
#[cfg(feature = "storage-remote")]
use crate::RemoteHandler;
#[cfg(feature = "storage-s3")]
use crate::S3Handler;
use crate::{Handler, PolicyKind, StorageError, StorageResult, UrlSigner};
use async_trait::async_trait;
use depot_core::models::Policy;
use depot_core::DepotConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Builds the handler serving a policy.
#[async_trait]
pub trait HandlerFactory: Send + Sync {
    async fn build(&self, policy: &Policy) -> StorageResult<Arc<dyn Handler>>;
}

/// Builds handlers from policy records and caches them per policy id.
///
/// Policies are immutable once files reference them, so a cached handler
/// stays valid for the life of the process.
pub struct DefaultHandlerFactory {
    signer: UrlSigner,
    site_url: String,
    local_storage_path: String,
    slave_secret: Option<String>,
    cache: Mutex<HashMap<Uuid, Arc<dyn Handler>>>,
}

impl DefaultHandlerFactory {
    pub fn new(config: &DepotConfig) -> Self {
        Self {
            signer: UrlSigner::new(config.signing_secret.as_bytes().to_vec()),
            site_url: config.site_url.clone(),
            local_storage_path: config.local_storage_path.clone(),
            slave_secret: config.slave_secret.clone(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn create(&self, policy: &Policy) -> StorageResult<Arc<dyn Handler>> {
        match policy.kind {
            #[cfg(feature = "storage-local")]
            PolicyKind::Local => {
                let root = policy
                    .root_path
                    .clone()
                    .unwrap_or_else(|| self.local_storage_path.clone());
                let base_url = policy
                    .base_url
                    .clone()
                    .unwrap_or_else(|| self.site_url.clone());

                let handler = LocalHandler::new(root, base_url, self.signer.clone()).await?;
                Ok(Arc::new(handler))
            }

            #[cfg(not(feature = "storage-local"))]
            PolicyKind::Local => Err(StorageError::ConfigError(
                "Local handler not available (storage-local feature not enabled)".to_string(),
            )),

            #[cfg(feature = "storage-remote")]
            PolicyKind::Remote => {
                let server = policy.server.clone().ok_or_else(|| {
                    StorageError::ConfigError(format!(
                        "Policy {} has no slave node URL",
                        policy.id
                    ))
                })?;
                let secret = policy
                    .secret_key
                    .clone()
                    .or_else(|| self.slave_secret.clone())
                    .ok_or_else(|| {
                        StorageError::ConfigError(format!(
                            "Policy {} has no slave secret and SLAVE_SECRET is not set",
                            policy.id
                        ))
                    })?;

                let handler = RemoteHandler::new(server, secret.into_bytes())?;
                Ok(Arc::new(handler))
            }

            #[cfg(not(feature = "storage-remote"))]
            PolicyKind::Remote => Err(StorageError::ConfigError(
                "Remote handler not available (storage-remote feature not enabled)".to_string(),
            )),

            #[cfg(feature = "storage-s3")]
            PolicyKind::S3 => {
                let bucket = policy.bucket_name.clone().ok_or_else(|| {
                    StorageError::ConfigError(format!("Policy {} has no bucket", policy.id))
                })?;
                let region = policy
                    .region
                    .clone()
                    .unwrap_or_else(|| "us-east-1".to_string());
                let credentials = policy.access_key.clone().zip(policy.secret_key.clone());

                let handler = S3Handler::new(
                    bucket,
                    region,
                    policy.server.clone(),
                    credentials,
                    policy.base_url.clone(),
                )?;
                Ok(Arc::new(handler))
            }

            #[cfg(not(feature = "storage-s3"))]
            PolicyKind::S3 => Err(StorageError::ConfigError(
                "S3 handler not available (storage-s3 feature not enabled)".to_string(),
            )),
        }
    }
}

#[async_trait]
impl HandlerFactory for DefaultHandlerFactory {
    async fn build(&self, policy: &Policy) -> StorageResult<Arc<dyn Handler>> {
        if let Some(handler) = self.cache.lock().await.get(&policy.id) {
            return Ok(handler.clone());
        }

        // Built without the lock held; a concurrent build of the same policy
        // loses to whichever handler was cached first.
        let handler = self.create(policy).await?;

        let mut cache = self.cache.lock().await;
        let cached = cache.entry(policy.id).or_insert_with(|| {
            tracing::debug!(
                policy_id = %policy.id,
                kind = %policy.kind,
                "Storage handler created"
            );
            handler
        });
        Ok(cached.clone())
    }
}
