use depot_core::constants::{
    DEFAULT_LINK_TTL_SECS, DEFAULT_MAX_EDIT_SIZE, MAX_EDIT_SIZE_SETTING, PREVIEW_TIMEOUT_SETTING,
};
use depot_storage::BoxedContent;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::context::OpContext;
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;
use crate::resolve::FileRef;

/// How the request layer should answer a preview
pub enum ContentResponse {
    /// Redirect to a signed link the client may cache for `max_age`
    Redirect { url: String, max_age: Duration },
    /// Stream these bytes in-process
    Content(BoxedContent),
}

impl ContentResponse {
    pub fn is_redirect(&self) -> bool {
        matches!(self, ContentResponse::Redirect { .. })
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ContentResponse::Redirect { url, .. } => Some(url),
            ContentResponse::Content(_) => None,
        }
    }

    pub fn max_age(&self) -> Option<Duration> {
        match self {
            ContentResponse::Redirect { max_age, .. } => Some(*max_age),
            ContentResponse::Content(_) => None,
        }
    }

    pub fn into_content(self) -> Option<BoxedContent> {
        match self {
            ContentResponse::Content(stream) => Some(stream),
            ContentResponse::Redirect { .. } => None,
        }
    }
}

impl fmt::Debug for ContentResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentResponse::Redirect { url, max_age } => f
                .debug_struct("Redirect")
                .field("url", url)
                .field("max_age", max_age)
                .finish(),
            ContentResponse::Content(_) => f.write_str("Content(..)"),
        }
    }
}

/// Text previews and directly-previewable policies stream; everything else redirects.
pub(crate) fn serve_directly(is_text: bool, policy_directly_previews: bool) -> bool {
    is_text || policy_directly_previews
}

/// Non-positive settings fall back to the default.
pub(crate) fn setting_secs(value: i64) -> Duration {
    let secs = if value > 0 { value } else { DEFAULT_LINK_TTL_SECS };
    Duration::from_secs(secs as u64)
}

impl FileSystem {
    pub async fn preview(
        &self,
        ctx: &OpContext,
        id: Uuid,
        is_text: bool,
    ) -> FsResult<ContentResponse> {
        let target = self.resolve(ctx, FileRef::Id(id)).await?;
        let file = target.first();

        if is_text {
            let limit = self
                .settings()
                .get_int(MAX_EDIT_SIZE_SETTING, DEFAULT_MAX_EDIT_SIZE)
                .await
                .max(0) as u64;
            if file.size > limit {
                return Err(FsError::SizeLimitExceeded {
                    size: file.size,
                    limit,
                });
            }
        }

        if serve_directly(is_text, target.policy().is_directly_preview) {
            let stream = self
                .get_download_content(ctx, FileRef::Resolved(target))
                .await?;
            return Ok(ContentResponse::Content(stream));
        }

        let ttl = setting_secs(
            self.settings()
                .get_int(PREVIEW_TIMEOUT_SETTING, DEFAULT_LINK_TTL_SECS)
                .await,
        );
        let url = self.sign_target(ctx, &target, Some(ttl), false).await?;

        Ok(ContentResponse::Redirect { url, max_age: ttl })
    }
}
