//! Handler for files stored on a remote slave node.
//!
//! The slave exposes a small HTTP API under `/api/v3/slave`. Management calls
//! (delete, upload cancellation) carry an `Authorization: Bearer <sign>` header
//! signed over the request path with the shared slave secret; download links
//! are signed the same way and embed the requesting group's speed limit so the
//! slave can throttle the transfer itself.
//!
//! Content reads stream the response body. Seeking drops the current body and
//! reopens the object with an HTTP `Range` request at the new offset.

use crate::signing::UrlSigner;
use crate::traits::{BoxedContent, DeleteOutcome, Handler, StorageError, StorageResult};
use async_trait::async_trait;
use base64::Engine;
use depot_core::models::UploadSession;
use depot_core::PolicyKind;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::io::{self, SeekFrom};
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};
use tokio_util::io::StreamReader;

/// Management requests are valid for this long
const REQUEST_SIGN_TTL: Duration = Duration::from_secs(60);

/// Envelope every slave endpoint answers with
#[derive(Debug, Deserialize)]
struct SlaveResponse {
    code: i32,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct DeleteRequest<'a> {
    files: &'a [String],
}

/// Remote slave node handler
#[derive(Clone)]
pub struct RemoteHandler {
    client: reqwest::Client,
    server: String,
    signer: UrlSigner,
}

impl RemoteHandler {
    /// Create a handler talking to the slave node at `server`.
    pub fn new(server: String, secret: impl Into<Vec<u8>>) -> StorageResult<Self> {
        if !server.starts_with("http://") && !server.starts_with("https://") {
            return Err(StorageError::ConfigError(format!(
                "Invalid slave node URL: {}",
                server
            )));
        }

        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            signer: UrlSigner::new(secret),
        })
    }

    fn encode_locator(locator: &str) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(locator)
    }

    fn file_name(locator: &str) -> &str {
        locator.rsplit('/').next().unwrap_or(locator)
    }

    /// Path of a content link for `locator`
    fn content_path(locator: &str, is_download: bool, speed_limit: u64) -> String {
        let action = if is_download { "download" } else { "source" };
        format!(
            "/api/v3/slave/{}/{}/{}/{}",
            action,
            speed_limit,
            Self::encode_locator(locator),
            urlencoding::encode(Self::file_name(locator))
        )
    }

    fn authorization(&self, path: &str) -> StorageResult<String> {
        let sign = self.signer.sign_for(path, Some(REQUEST_SIGN_TTL))?;
        Ok(format!("Bearer {}", sign))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> StorageResult<SlaveResponse> {
        let response = request
            .send()
            .await
            .map_err(|e| StorageError::BackendError(format!("Slave request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(StorageError::BackendError(format!(
                "Slave node answered with status {}",
                status
            )));
        }

        response
            .json::<SlaveResponse>()
            .await
            .map_err(|e| StorageError::BackendError(format!("Invalid slave response: {}", e)))
    }
}

impl RemoteHandler {
    /// Open `locator` from `offset` on. Returns once the response headers are
    /// in; the body is left unread.
    async fn fetch(&self, locator: &str, offset: u64) -> StorageResult<reqwest::Response> {
        let path = Self::content_path(locator, false, 0);
        let sign = self.signer.sign_for(&path, Some(REQUEST_SIGN_TTL))?;
        let url = format!("{}{}?sign={}", self.server, path, urlencoding::encode(&sign));

        let mut request = self.client.get(&url);
        if offset > 0 {
            request = request.header(reqwest::header::RANGE, format!("bytes={}-", offset));
        }

        let response = request
            .send()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        match response.status() {
            reqwest::StatusCode::NOT_FOUND => Err(StorageError::NotFound(locator.to_string())),
            reqwest::StatusCode::PARTIAL_CONTENT => Ok(response),
            reqwest::StatusCode::OK if offset == 0 => Ok(response),
            reqwest::StatusCode::OK => Err(StorageError::DownloadFailed(
                "Slave node ignored range request".to_string(),
            )),
            status => Err(StorageError::DownloadFailed(format!(
                "Slave node answered with status {}",
                status
            ))),
        }
    }
}

type BodyReader = Pin<Box<dyn AsyncRead + Send>>;
type PendingBody = Pin<Box<dyn Future<Output = io::Result<BodyReader>> + Send>>;

fn body_reader(response: reqwest::Response) -> BodyReader {
    let stream = response.bytes_stream().map_err(io::Error::other);
    Box::pin(StreamReader::new(stream))
}

enum ReadState {
    /// No body open; the next read requests one at `position`
    Idle,
    Opening(PendingBody),
    Reading(BodyReader),
    Eof,
}

/// Seekable stream over a slave object, read through range requests
struct RangeReader {
    handler: RemoteHandler,
    locator: String,
    size: Option<u64>,
    position: u64,
    state: ReadState,
}

impl RangeReader {
    fn new(
        handler: RemoteHandler,
        locator: String,
        size: Option<u64>,
        response: reqwest::Response,
    ) -> Self {
        Self {
            handler,
            locator,
            size,
            position: 0,
            state: ReadState::Reading(body_reader(response)),
        }
    }
}

impl AsyncRead for RangeReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        loop {
            match &mut this.state {
                ReadState::Eof => return Poll::Ready(Ok(())),
                ReadState::Idle => {
                    if this.size.is_some_and(|size| this.position >= size) {
                        this.state = ReadState::Eof;
                        continue;
                    }
                    let handler = this.handler.clone();
                    let locator = this.locator.clone();
                    let offset = this.position;
                    this.state = ReadState::Opening(Box::pin(async move {
                        let response = handler
                            .fetch(&locator, offset)
                            .await
                            .map_err(io::Error::other)?;
                        Ok(body_reader(response))
                    }));
                }
                ReadState::Opening(pending) => {
                    let opened = ready!(pending.as_mut().poll(cx));
                    match opened {
                        Ok(body) => this.state = ReadState::Reading(body),
                        Err(e) => {
                            this.state = ReadState::Idle;
                            return Poll::Ready(Err(e));
                        }
                    }
                }
                ReadState::Reading(body) => {
                    let before = buf.filled().len();
                    ready!(body.as_mut().poll_read(cx, buf))?;
                    let read = buf.filled().len() - before;
                    if read == 0 && buf.remaining() > 0 {
                        this.state = ReadState::Eof;
                    }
                    this.position += read as u64;
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}

impl AsyncSeek for RangeReader {
    fn start_seek(self: Pin<&mut Self>, position: SeekFrom) -> io::Result<()> {
        let this = self.get_mut();
        let target = match position {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::Current(delta) => this.position.checked_add_signed(delta),
            SeekFrom::End(delta) => {
                let size = this.size.ok_or_else(|| {
                    io::Error::new(io::ErrorKind::Unsupported, "slave object size is unknown")
                })?;
                size.checked_add_signed(delta)
            }
        }
        .ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "seek before start of object")
        })?;

        if target != this.position {
            this.position = target;
            this.state = ReadState::Idle;
        }
        Ok(())
    }

    fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
        Poll::Ready(Ok(self.position))
    }
}

#[async_trait]
impl Handler for RemoteHandler {
    async fn get(&self, locator: &str) -> StorageResult<BoxedContent> {
        let response = self.fetch(locator, 0).await?;
        let size = response.content_length();

        tracing::debug!(
            server = %self.server,
            key = %locator,
            size_bytes = ?size,
            "Slave content opened"
        );

        Ok(Box::new(RangeReader::new(
            self.clone(),
            locator.to_string(),
            size,
            response,
        )))
    }

    async fn delete(&self, locators: &[String]) -> DeleteOutcome {
        let path = "/api/v3/slave/delete";
        let auth = match self.authorization(path) {
            Ok(auth) => auth,
            Err(e) => return DeleteOutcome::all_failed(locators, e),
        };

        let request = self
            .client
            .post(format!("{}{}", self.server, path))
            .header(reqwest::header::AUTHORIZATION, auth)
            .json(&DeleteRequest { files: locators });

        let response = match self.send(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!(error = %e, server = %self.server, "Slave delete request failed");
                return DeleteOutcome::all_failed(locators, e);
            }
        };

        if response.code == 0 {
            return DeleteOutcome::success();
        }

        // The slave lists what it could not remove; anything unparsable
        // means nothing can be assumed deleted.
        let failed = response
            .data
            .and_then(|data| serde_json::from_value::<Vec<String>>(data).ok())
            .unwrap_or_else(|| locators.to_vec());

        DeleteOutcome {
            failed,
            error: Some(StorageError::DeleteFailed(response.msg)),
        }
    }

    async fn source(
        &self,
        locator: &str,
        ttl: Option<Duration>,
        is_download: bool,
        speed_limit: u64,
    ) -> StorageResult<String> {
        let path = Self::content_path(locator, is_download, speed_limit);
        let sign = self.signer.sign_for(&path, ttl)?;

        Ok(format!(
            "{}{}?sign={}",
            self.server,
            path,
            urlencoding::encode(&sign)
        ))
    }

    async fn cancel_token(&self, session: &UploadSession) -> StorageResult<()> {
        let path = format!("/api/v3/slave/upload/{}", urlencoding::encode(&session.key));
        let auth = self.authorization(&path)?;

        let request = self
            .client
            .delete(format!("{}{}", self.server, path))
            .header(reqwest::header::AUTHORIZATION, auth);

        let response = self.send(request).await?;
        if response.code != 0 {
            return Err(StorageError::CancelFailed(response.msg));
        }

        Ok(())
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Remote
    }
}
