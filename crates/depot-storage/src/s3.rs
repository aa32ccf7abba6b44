use crate::traits::{BoxedContent, DeleteOutcome, Handler, StorageError, StorageResult};
use async_trait::async_trait;
use depot_core::models::UploadSession;
use depot_core::PolicyKind;
use futures::stream::{self, StreamExt};
use http::Method;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::buffered::BufReader;
use object_store::multipart::MultipartStore;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStore, ObjectStoreExt, Result as ObjectResult};
use std::sync::Arc;
use std::time::Duration;

/// Parallel deletes issued per batch
const DELETE_CONCURRENCY: usize = 16;

/// S3-compatible object store handler
#[derive(Clone)]
pub struct S3Handler {
    store: Arc<AmazonS3>,
    bucket: String,
    region: String,
    endpoint_url: Option<String>, // Custom endpoint for S3-compatible providers
    public_base_url: Option<String>,
}

impl S3Handler {
    /// Create a new S3Handler instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    /// * `credentials` - Optional (access key, secret key); falls back to the environment
    /// * `public_base_url` - Optional CDN / public base for non-expiring links
    pub fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
        credentials: Option<(String, String)>,
        public_base_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some((access_key, secret_key)) = credentials {
            builder = builder
                .with_access_key_id(access_key)
                .with_secret_access_key(secret_key);
        }

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Handler {
            store: Arc::new(store),
            bucket,
            region,
            endpoint_url,
            public_base_url,
        })
    }

    /// Generate the public URL for an object
    ///
    /// Prefers the policy's public base, then the custom endpoint (path-style),
    /// then the standard AWS virtual-hosted format.
    fn generate_url(&self, key: &str) -> String {
        if let Some(ref base) = self.public_base_url {
            format!("{}/{}", base.trim_end_matches('/'), key)
        } else if let Some(ref endpoint) = self.endpoint_url {
            let base_url = endpoint.trim_end_matches('/');
            format!("{}/{}/{}", base_url, self.bucket, key)
        } else {
            format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            )
        }
    }
}

#[async_trait]
impl Handler for S3Handler {
    async fn get(&self, locator: &str) -> StorageResult<BoxedContent> {
        let location = Path::from(locator.to_string());

        let meta = self.store.head(&location).await.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(locator.to_string()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %locator,
                    "S3 head failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let store: Arc<dyn ObjectStore> = self.store.clone();
        let reader = BufReader::new(store, &meta);

        tracing::debug!(
            bucket = %self.bucket,
            key = %locator,
            size_bytes = meta.size,
            "S3 object opened"
        );

        Ok(Box::new(reader))
    }

    async fn delete(&self, locators: &[String]) -> DeleteOutcome {
        let start = std::time::Instant::now();

        let results: Vec<(String, ObjectResult<()>)> = stream::iter(locators.iter().cloned())
            .map(|key| {
                let store = self.store.clone();
                async move {
                    let location = Path::from(key.clone());
                    let result = store.delete(&location).await;
                    (key, result)
                }
            })
            .buffer_unordered(DELETE_CONCURRENCY)
            .collect()
            .await;

        let mut outcome = DeleteOutcome::success();
        for (key, result) in results {
            match result {
                Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        bucket = %self.bucket,
                        key = %key,
                        "S3 delete failed"
                    );
                    outcome.failed.push(key);
                    outcome.error = Some(StorageError::DeleteFailed(e.to_string()));
                }
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            requested = locators.len(),
            failed = outcome.failed.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 batch delete finished"
        );

        outcome
    }

    async fn source(
        &self,
        locator: &str,
        ttl: Option<Duration>,
        _is_download: bool,
        _speed_limit: u64,
    ) -> StorageResult<String> {
        let Some(ttl) = ttl else {
            return Ok(self.generate_url(locator));
        };

        let location = Path::from(locator.to_string());
        let url_result: ObjectResult<_> = self.store.signed_url(Method::GET, &location, ttl).await;

        let url = url_result
            .map_err(|e| StorageError::SignFailed(e.to_string()))?
            .to_string();

        Ok(url)
    }

    async fn cancel_token(&self, session: &UploadSession) -> StorageResult<()> {
        let Some(ref upload_id) = session.upload_id else {
            return Ok(());
        };

        let location = Path::from(session.save_path.clone());
        self.store
            .abort_multipart(&location, upload_id)
            .await
            .map_err(|e| {
                StorageError::CancelFailed(format!(
                    "Failed to abort multipart upload {}: {}",
                    upload_id, e
                ))
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %session.save_path,
            upload_id = %upload_id,
            "S3 multipart upload aborted"
        );

        Ok(())
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::S3
    }
}
