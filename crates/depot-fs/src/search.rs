use depot_core::models::{File, Object, ObjectKind};
use std::collections::HashMap;
use uuid::Uuid;

use crate::context::OpContext;
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;

/// Search hits: the matched records and their listing entries, index-aligned.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub files: Vec<File>,
    pub objects: Vec<Object>,
}

impl FileSystem {
    /// Files of the current user whose name matches any of `terms`, below
    /// `root` (recursively) when given.
    #[tracing::instrument(skip(self, ctx), fields(user_id = %self.user().id))]
    pub async fn search(
        &self,
        ctx: &OpContext,
        terms: &[String],
        root: Option<Uuid>,
    ) -> FsResult<Listing> {
        let owner = self.user().id;

        let parents = match root {
            Some(root) => {
                let folders = self
                    .files()
                    .get_recursive_descendant_folders(&[root], owner)
                    .await?;
                // An unknown or foreign root must not widen into an unscoped search
                if folders.is_empty() {
                    return Ok(Listing::default());
                }
                folders
            }
            None => Vec::new(),
        };

        if ctx.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        let files = self
            .files()
            .get_files_by_keywords(owner, &parents, terms)
            .await?;
        let objects = self.list_objects(&files).await?;

        tracing::debug!(hits = files.len(), scoped = root.is_some(), "Search finished");
        Ok(Listing { files, objects })
    }

    async fn list_objects(&self, files: &[File]) -> FsResult<Vec<Object>> {
        let owner = self.user().id;
        let mut paths: HashMap<Uuid, String> = HashMap::new();
        let mut source_enabled: HashMap<Uuid, bool> = HashMap::new();
        let mut objects = Vec::with_capacity(files.len());

        for file in files {
            if !paths.contains_key(&file.folder_id) {
                let path = self.files().get_folder_path(file.folder_id, owner).await?;
                paths.insert(file.folder_id, path);
            }
            if !source_enabled.contains_key(&file.policy_id) {
                let enabled = match self.files().get_policy(file.policy_id).await {
                    Ok(policy) => policy.is_origin_link_enable,
                    Err(e) => {
                        tracing::warn!(error = %e, policy_id = %file.policy_id, "Policy lookup failed");
                        false
                    }
                };
                source_enabled.insert(file.policy_id, enabled);
            }

            objects.push(Object {
                id: file.id,
                name: file.name.clone(),
                path: paths.get(&file.folder_id).cloned().unwrap_or_default(),
                thumb: file.has_sidecar_thumb(),
                size: file.size,
                kind: ObjectKind::File,
                date: file.updated_at,
                create_date: file.created_at,
                source_enabled: source_enabled
                    .get(&file.policy_id)
                    .copied()
                    .unwrap_or(false),
            });
        }

        Ok(objects)
    }
}
