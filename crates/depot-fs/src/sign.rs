use depot_core::constants::DEFAULT_LINK_TTL_SECS;
use depot_core::models::File;
use std::time::Duration;
use uuid::Uuid;

use crate::context::OpContext;
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;
use crate::preview::setting_secs;
use crate::resolve::{FileRef, Target};

impl FileSystem {
    /// Signed link to `file`, valid for `ttl` or forever when `ttl` is `None`.
    ///
    /// Does not check whether the policy permits origin links; callers that
    /// hand out non-expiring links check that themselves.
    pub async fn sign_url(
        &self,
        ctx: &OpContext,
        file: &File,
        ttl: Option<Duration>,
        is_download: bool,
    ) -> FsResult<String> {
        let target = self.bind_files(vec![file.clone()]).await?;
        self.sign_target(ctx, &target, ttl, is_download).await
    }

    /// Download link with the ttl read from `ttl_setting`.
    pub async fn get_download_url(
        &self,
        ctx: &OpContext,
        id: Uuid,
        ttl_setting: &str,
    ) -> FsResult<String> {
        let target = self.resolve(ctx, FileRef::Id(id)).await?;
        let ttl = setting_secs(
            self.settings()
                .get_int(ttl_setting, DEFAULT_LINK_TTL_SECS)
                .await,
        );

        self.sign_target(ctx, &target, Some(ttl), true).await
    }

    /// Non-expiring source link; only for policies with origin links enabled.
    pub async fn get_source(&self, ctx: &OpContext, id: Uuid) -> FsResult<String> {
        let target = match self.resolve(ctx, FileRef::Id(id)).await {
            Ok(target) => target,
            Err(FsError::Cancelled) => return Err(FsError::Cancelled),
            Err(e) => {
                tracing::debug!(error = %e, file_id = %id, "Source link target not resolvable");
                return Err(FsError::NotFound(format!("file {}", id)));
            }
        };

        if !target.policy().is_origin_link_enable {
            return Err(FsError::PolicyNotAllowed(target.policy().id));
        }

        self.sign_target(ctx, &target, None, false).await
    }

    pub(crate) async fn sign_target(
        &self,
        ctx: &OpContext,
        target: &Target,
        ttl: Option<Duration>,
        is_download: bool,
    ) -> FsResult<String> {
        let file = target.first();
        let speed_limit = self.user().group.speed_limit;

        ctx.run(target.binding().handler.source(
            &file.source_name,
            ttl,
            is_download,
            speed_limit,
        ))
        .await?
        .map_err(|e| {
            tracing::error!(
                error = %e,
                file_id = %file.id,
                policy_id = %file.policy_id,
                "Failed to get source link"
            );
            FsError::BackendIo(e)
        })
    }
}
