use async_trait::async_trait;
use depot_core::models::{File, Policy};
use uuid::Uuid;

use crate::error::StoreResult;

/// Lookups and mutations over file, folder, policy and user records.
///
/// Every query that takes an `owner` only returns records that owner holds.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Insert a new file record. A name already taken in the folder is a
    /// `StoreError::Conflict`.
    async fn create_file(&self, file: &File) -> StoreResult<()>;

    async fn get_files_by_ids(&self, ids: &[Uuid], owner: Uuid) -> StoreResult<Vec<File>>;

    /// The file at a virtual path such as `/docs/report.pdf`, if any.
    async fn get_file_by_path(&self, owner: Uuid, path: &str) -> StoreResult<Option<File>>;

    /// Files whose name matches any of `terms`. An empty `parents` slice
    /// searches every folder of the owner.
    async fn get_files_by_keywords(
        &self,
        owner: Uuid,
        parents: &[Uuid],
        terms: &[String],
    ) -> StoreResult<Vec<File>>;

    /// Ids of `roots` and of every folder below them.
    async fn get_recursive_descendant_folders(
        &self,
        roots: &[Uuid],
        owner: Uuid,
    ) -> StoreResult<Vec<Uuid>>;

    async fn get_policy(&self, id: Uuid) -> StoreResult<Policy>;

    /// Virtual path of a folder, `/` for a root folder.
    async fn get_folder_path(&self, folder_id: Uuid, owner: Uuid) -> StoreResult<String>;

    /// Remove the owner's file records among `ids`. Returns how many went.
    async fn delete_files(&self, ids: &[Uuid], owner: Uuid) -> StoreResult<u64>;

    async fn increase_user_storage(&self, user_id: Uuid, delta: u64) -> StoreResult<()>;

    /// Release `delta` bytes of used storage, never going below zero.
    async fn decrease_user_storage(&self, user_id: Uuid, delta: u64) -> StoreResult<()>;
}

/// Runtime-tunable integer settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// The setting `key`, or `default` when it is unset or not an integer.
    async fn get_int(&self, key: &str, default: i64) -> i64;
}
