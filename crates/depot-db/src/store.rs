//! `FileStore` and `SettingsStore` backed by PostgreSQL.

use async_trait::async_trait;
use depot_core::models::{File, Policy};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{
    FileRepository, FolderRepository, PolicyRepository, SettingsRepository, UserRepository,
};
use crate::error::{StoreError, StoreResult};
use crate::traits::{FileStore, SettingsStore};

#[derive(Clone)]
pub struct PgFileStore {
    files: FileRepository,
    folders: FolderRepository,
    policies: PolicyRepository,
    users: UserRepository,
}

impl PgFileStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            files: FileRepository::new(pool.clone()),
            folders: FolderRepository::new(pool.clone()),
            policies: PolicyRepository::new(pool.clone()),
            users: UserRepository::new(pool),
        }
    }
}

/// Split `/a/b/c.txt` into (`/a/b`, `c.txt`).
fn split_path(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    let (dir, name) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if name.is_empty() {
        None
    } else {
        Some((dir, name))
    }
}

#[async_trait]
impl FileStore for PgFileStore {
    async fn create_file(&self, file: &File) -> StoreResult<()> {
        self.files.create(file).await
    }

    async fn get_files_by_ids(&self, ids: &[Uuid], owner: Uuid) -> StoreResult<Vec<File>> {
        self.files.get_by_ids(ids, owner).await
    }

    async fn get_file_by_path(&self, owner: Uuid, path: &str) -> StoreResult<Option<File>> {
        let Some((dir, name)) = split_path(path) else {
            return Ok(None);
        };
        let Some(folder_id) = self.folders.get_by_path(owner, dir).await? else {
            return Ok(None);
        };

        self.files.get_in_folder(owner, folder_id, name).await
    }

    async fn get_files_by_keywords(
        &self,
        owner: Uuid,
        parents: &[Uuid],
        terms: &[String],
    ) -> StoreResult<Vec<File>> {
        self.files.search(owner, parents, terms).await
    }

    async fn get_recursive_descendant_folders(
        &self,
        roots: &[Uuid],
        owner: Uuid,
    ) -> StoreResult<Vec<Uuid>> {
        self.folders.get_descendants(roots, owner).await
    }

    async fn get_policy(&self, id: Uuid) -> StoreResult<Policy> {
        self.policies
            .get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("policy {}", id)))
    }

    async fn get_folder_path(&self, folder_id: Uuid, owner: Uuid) -> StoreResult<String> {
        self.folders.get_path(folder_id, owner).await
    }

    async fn delete_files(&self, ids: &[Uuid], owner: Uuid) -> StoreResult<u64> {
        self.files.delete_by_ids(ids, owner).await
    }

    async fn increase_user_storage(&self, user_id: Uuid, delta: u64) -> StoreResult<()> {
        self.users.increase_storage(user_id, delta).await
    }

    async fn decrease_user_storage(&self, user_id: Uuid, delta: u64) -> StoreResult<()> {
        self.users.decrease_storage(user_id, delta).await
    }
}

#[derive(Clone)]
pub struct PgSettingsStore {
    settings: SettingsRepository,
}

impl PgSettingsStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            settings: SettingsRepository::new(pool),
        }
    }
}

#[async_trait]
impl SettingsStore for PgSettingsStore {
    async fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.settings.get(key).await {
            Ok(Some(value)) => value.trim().parse().unwrap_or(default),
            Ok(None) => default,
            Err(e) => {
                tracing::warn!(error = %e, setting = %key, "Failed to read setting, using default");
                default
            }
        }
    }
}
