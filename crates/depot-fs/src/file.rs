use chrono::Utc;
use depot_core::models::{File, Folder, UploadInfo};
use depot_db::StoreError;
use uuid::Uuid;

use crate::context::OpContext;
use crate::dispatch::Binding;
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;

impl FileSystem {
    /// Record an upload the backend behind `binding` has accepted.
    ///
    /// A name already taken in `parent` is a [`FsError::Conflict`]. On success
    /// the file size is charged to the owner.
    #[tracing::instrument(skip(self, ctx, binding, parent, upload), fields(policy_id = %binding.policy_id(), folder_id = %parent.id))]
    pub async fn add_file(
        &self,
        ctx: &OpContext,
        binding: &Binding,
        parent: &Folder,
        upload: UploadInfo,
    ) -> FsResult<File> {
        if parent.owner_id != self.user().id {
            return Err(FsError::NotFound(format!("folder {}", parent.id)));
        }
        if ctx.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        let now = Utc::now();
        let file = File {
            id: Uuid::new_v4(),
            user_id: self.user().id,
            name: upload.file_name,
            folder_id: parent.id,
            policy_id: binding.policy_id(),
            source_name: upload.save_path,
            size: upload.size,
            metadata: upload.metadata,
            upload_session_id: upload.upload_session_id,
            created_at: now,
            updated_at: now,
        };

        match self.files().create_file(&file).await {
            Ok(()) => {}
            Err(StoreError::Conflict(_)) => return Err(FsError::Conflict(file.name)),
            Err(e) => return Err(FsError::Store(e)),
        }

        if let Err(e) = self
            .files()
            .increase_user_storage(self.user().id, file.size)
            .await
        {
            tracing::error!(
                error = %e,
                file_id = %file.id,
                size_bytes = file.size,
                "Failed to account storage for new file"
            );
        }

        tracing::info!(file_id = %file.id, size_bytes = file.size, "File added");
        Ok(file)
    }
}
