//! File target resolution
//!
//! Turns an id or a virtual path into file records owned by the current
//! user, checks the optional parent-folder constraint and dispatches to the
//! policy of the first record.

use depot_core::models::{File, Policy};
use uuid::Uuid;

use crate::context::OpContext;
use crate::dispatch::Binding;
use crate::error::{FsError, FsResult};
use crate::filesystem::FileSystem;

/// Resolved files plus the binding of the first one.
///
/// Never empty. The first file is authoritative for dispatch.
#[derive(Debug, Clone)]
pub struct Target {
    files: Vec<File>,
    binding: Binding,
}

impl Target {
    pub(crate) fn new(files: Vec<File>, binding: Binding) -> Option<Self> {
        if files.is_empty() {
            return None;
        }
        Some(Self { files, binding })
    }

    pub fn first(&self) -> &File {
        &self.files[0]
    }

    pub fn files(&self) -> &[File] {
        &self.files
    }

    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    pub fn policy(&self) -> &Policy {
        &self.binding.policy
    }

    pub fn into_files(self) -> Vec<File> {
        self.files
    }
}

/// What an operation acts on
#[derive(Debug, Clone)]
pub enum FileRef {
    Id(Uuid),
    /// Virtual path such as `/docs/report.pdf`
    Path(String),
    /// Already resolved; resolving again returns it unchanged
    Resolved(Target),
}

impl From<Uuid> for FileRef {
    fn from(id: Uuid) -> Self {
        FileRef::Id(id)
    }
}

impl From<Target> for FileRef {
    fn from(target: Target) -> Self {
        FileRef::Resolved(target)
    }
}

impl FileSystem {
    pub async fn resolve(&self, ctx: &OpContext, file: FileRef) -> FsResult<Target> {
        let record = match file {
            FileRef::Resolved(target) => return Ok(target),
            FileRef::Id(id) => self.find_by_id(id).await?,
            FileRef::Path(ref path) => self.find_by_path(path).await?,
        };

        check_parent(ctx, &record)?;
        self.bind_files(vec![record]).await
    }

    /// Bind records the caller already loaded, dispatching on the first.
    pub async fn bind_files(&self, files: Vec<File>) -> FsResult<Target> {
        let Some(first) = files.first() else {
            return Err(FsError::NotFound("empty target".to_string()));
        };
        let binding = self.dispatcher().dispatch(first.policy_id).await?;

        Target::new(files, binding).ok_or_else(|| FsError::NotFound("empty target".to_string()))
    }

    /// Records of the current user among `ids`; unknown ids are skipped.
    pub async fn load_files(&self, ids: &[Uuid]) -> FsResult<Vec<File>> {
        Ok(self.files().get_files_by_ids(ids, self.user().id).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> FsResult<File> {
        let files = self
            .files()
            .get_files_by_ids(&[id], self.user().id)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, file_id = %id, "File lookup failed");
                FsError::NotFound(format!("file {}", id))
            })?;

        files
            .into_iter()
            .next()
            .ok_or_else(|| FsError::NotFound(format!("file {}", id)))
    }

    async fn find_by_path(&self, path: &str) -> FsResult<File> {
        let file = self
            .files()
            .get_file_by_path(self.user().id, path)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, path = %path, "File lookup failed");
                FsError::NotFound(path.to_string())
            })?;

        file.ok_or_else(|| FsError::NotFound(path.to_string()))
    }
}

/// A file outside the required folder looks exactly like a missing one.
fn check_parent(ctx: &OpContext, file: &File) -> FsResult<()> {
    match ctx.limit_parent {
        Some(ref parent) if parent.id != file.folder_id => {
            tracing::debug!(
                file_id = %file.id,
                folder_id = %file.folder_id,
                required_parent = %parent.id,
                "Resolved file is outside the required folder"
            );
            Err(FsError::NotFound(format!("file {}", file.id)))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use depot_core::models::Folder;
    use std::collections::HashMap;

    fn file_in(folder_id: Uuid) -> File {
        File {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "a.txt".to_string(),
            folder_id,
            policy_id: Uuid::new_v4(),
            source_name: "a.txt".to_string(),
            size: 1,
            metadata: HashMap::new(),
            upload_session_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn folder(id: Uuid) -> Folder {
        Folder {
            id,
            owner_id: Uuid::new_v4(),
            name: "docs".to_string(),
            parent_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn parent_constraint() {
        let folder_id = Uuid::new_v4();
        let unconstrained = OpContext::default();
        let constrained = OpContext::default().with_limit_parent(folder(folder_id));

        assert!(check_parent(&unconstrained, &file_in(Uuid::new_v4())).is_ok());
        assert!(check_parent(&constrained, &file_in(folder_id)).is_ok());
        assert!(matches!(
            check_parent(&constrained, &file_in(Uuid::new_v4())),
            Err(FsError::NotFound(_))
        ));
    }
}
