use depot_core::models::Policy;
use depot_storage::BoxedContent;

use crate::context::OpContext;
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;
use crate::resolve::{FileRef, Target};
use crate::speed_limit;

impl FileSystem {
    /// Stream of the first target's bytes, unthrottled.
    pub async fn get_content(&self, ctx: &OpContext, file: FileRef) -> FsResult<BoxedContent> {
        let target = self.resolve(ctx, file).await?;
        self.open(ctx, &target).await
    }

    /// Stream of the first target's bytes, throttled to the user's group cap.
    pub async fn get_download_content(
        &self,
        ctx: &OpContext,
        file: FileRef,
    ) -> FsResult<BoxedContent> {
        let stream = self.get_content(ctx, file).await?;
        Ok(speed_limit::limit(stream, self.user().group.speed_limit))
    }

    /// Stream a file by physical path through the built-in local policy.
    ///
    /// `path` is relative to the local storage root, or absolute under it.
    pub async fn get_physical_content(
        &self,
        ctx: &OpContext,
        path: &str,
    ) -> FsResult<BoxedContent> {
        let binding = self
            .dispatcher()
            .dispatch_policy(Policy::builtin_local())
            .await?;

        let stream = ctx
            .run(binding.handler.get(path))
            .await?
            .map_err(|e| {
                tracing::warn!(error = %e, path = %path, "Failed to open physical file");
                FsError::BackendIo(e)
            })?;

        Ok(speed_limit::limit(stream, self.user().group.speed_limit))
    }

    pub(crate) async fn open(&self, ctx: &OpContext, target: &Target) -> FsResult<BoxedContent> {
        let file = target.first();
        let handler = &target.binding().handler;

        ctx.run(handler.get(&file.source_name))
            .await?
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    file_id = %file.id,
                    policy_id = %file.policy_id,
                    locator = %file.source_name,
                    "Failed to open file content"
                );
                FsError::BackendIo(e)
            })
    }
}
