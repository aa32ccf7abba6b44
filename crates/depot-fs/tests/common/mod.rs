//! In-memory collaborators for file-system integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use depot_core::models::{File, Folder, Group, Policy, UploadSession, User};
use depot_core::PolicyKind;
use depot_db::{FileStore, SettingsStore, StoreError, StoreResult};
use depot_fs::{FileSystem, FsDeps, FsOptions};
use depot_infra::{MemorySessionStore, SessionStore};
use depot_storage::{
    BoxedContent, DeleteOutcome, Handler, HandlerFactory, StorageError, StorageResult,
};
use std::collections::{HashMap, HashSet};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Get(String),
    Delete(Vec<String>),
    Source {
        locator: String,
        ttl: Option<Duration>,
        is_download: bool,
        speed_limit: u64,
    },
    Cancel(String),
}

/// Handler keeping objects in memory and recording every call
#[derive(Default)]
pub struct RecordingHandler {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    failing: HashSet<String>,
    delete_error: Option<String>,
    fail_cancel: bool,
    calls: Mutex<Vec<Call>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(self, locator: &str, bytes: Vec<u8>) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(locator.to_string(), bytes);
        self
    }

    /// Deleting `locator` always fails
    pub fn failing(mut self, locator: &str) -> Self {
        self.failing.insert(locator.to_string());
        self
    }

    /// Batch delete reports this error alongside its failed list
    pub fn with_delete_error(mut self, message: &str) -> Self {
        self.delete_error = Some(message.to_string());
        self
    }

    pub fn failing_cancel(mut self) -> Self {
        self.fail_cancel = true;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn has_object(&self, locator: &str) -> bool {
        self.objects.lock().unwrap().contains_key(locator)
    }

    pub fn source_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Source { .. }))
            .count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn get(&self, locator: &str) -> StorageResult<BoxedContent> {
        self.record(Call::Get(locator.to_string()));
        let bytes = self
            .objects
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(locator.to_string()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    async fn delete(&self, locators: &[String]) -> DeleteOutcome {
        self.record(Call::Delete(locators.to_vec()));
        let mut outcome = DeleteOutcome::success();
        let mut objects = self.objects.lock().unwrap();
        for locator in locators {
            if self.failing.contains(locator) {
                outcome.failed.push(locator.clone());
            } else {
                objects.remove(locator);
            }
        }
        if let Some(ref message) = self.delete_error {
            outcome.error = Some(StorageError::DeleteFailed(message.clone()));
        }
        outcome
    }

    async fn source(
        &self,
        locator: &str,
        ttl: Option<Duration>,
        is_download: bool,
        speed_limit: u64,
    ) -> StorageResult<String> {
        self.record(Call::Source {
            locator: locator.to_string(),
            ttl,
            is_download,
            speed_limit,
        });
        let expires = ttl.map(|t| t.as_secs()).unwrap_or(0);
        Ok(format!(
            "https://backend.test/{}?expires={}&download={}",
            locator, expires, is_download
        ))
    }

    async fn cancel_token(&self, session: &UploadSession) -> StorageResult<()> {
        self.record(Call::Cancel(session.key.clone()));
        if self.fail_cancel {
            return Err(StorageError::CancelFailed("backend refused".to_string()));
        }
        Ok(())
    }

    fn kind(&self) -> PolicyKind {
        PolicyKind::Local
    }
}

/// Factory handing out pre-registered handlers; unknown policies fail to build
#[derive(Default)]
pub struct StaticHandlerFactory {
    handlers: HashMap<Uuid, Arc<dyn Handler>>,
}

impl StaticHandlerFactory {
    pub fn with(mut self, policy_id: Uuid, handler: Arc<dyn Handler>) -> Self {
        self.handlers.insert(policy_id, handler);
        self
    }
}

#[async_trait]
impl HandlerFactory for StaticHandlerFactory {
    async fn build(&self, policy: &Policy) -> StorageResult<Arc<dyn Handler>> {
        self.handlers
            .get(&policy.id)
            .cloned()
            .ok_or_else(|| StorageError::ConfigError(format!("no handler for {}", policy.id)))
    }
}

// ---------------------------------------------------------------------------
// Stores
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryFileStore {
    files: Mutex<HashMap<Uuid, File>>,
    folders: Mutex<HashMap<Uuid, Folder>>,
    policies: Mutex<HashMap<Uuid, Policy>>,
    storage: Mutex<HashMap<Uuid, u64>>,
    fail_lookups: bool,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_lookups(mut self) -> Self {
        self.fail_lookups = true;
        self
    }

    pub fn add_file(&self, file: File) {
        self.files.lock().unwrap().insert(file.id, file);
    }

    pub fn add_folder(&self, folder: Folder) {
        self.folders.lock().unwrap().insert(folder.id, folder);
    }

    pub fn add_policy(&self, policy: Policy) {
        self.policies.lock().unwrap().insert(policy.id, policy);
    }

    pub fn has_file(&self, id: Uuid) -> bool {
        self.files.lock().unwrap().contains_key(&id)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    pub fn storage_of(&self, user_id: Uuid) -> u64 {
        self.storage
            .lock()
            .unwrap()
            .get(&user_id)
            .copied()
            .unwrap_or(0)
    }

    fn folder_path(&self, folder_id: Uuid) -> Option<String> {
        let folders = self.folders.lock().unwrap();
        let mut names = Vec::new();
        let mut current = folders.get(&folder_id)?;
        while let Some(parent_id) = current.parent_id {
            names.push(current.name.clone());
            current = folders.get(&parent_id)?;
        }
        names.reverse();
        Some(format!("/{}", names.join("/")))
    }

    fn check(&self) -> StoreResult<()> {
        if self.fail_lookups {
            return Err(StoreError::InvalidRecord("lookup failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn create_file(&self, file: &File) -> StoreResult<()> {
        let mut files = self.files.lock().unwrap();
        let taken = files
            .values()
            .any(|f| f.folder_id == file.folder_id && f.name == file.name);
        if taken {
            return Err(StoreError::Conflict(file.name.clone()));
        }
        files.insert(file.id, file.clone());
        Ok(())
    }

    async fn get_files_by_ids(&self, ids: &[Uuid], owner: Uuid) -> StoreResult<Vec<File>> {
        self.check()?;
        let files = self.files.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| files.get(id))
            .filter(|f| f.user_id == owner)
            .cloned()
            .collect())
    }

    async fn get_file_by_path(&self, owner: Uuid, path: &str) -> StoreResult<Option<File>> {
        self.check()?;
        let candidates: Vec<File> = self
            .files
            .lock()
            .unwrap()
            .values()
            .filter(|f| f.user_id == owner)
            .cloned()
            .collect();

        Ok(candidates.into_iter().find(|f| {
            self.folder_path(f.folder_id)
                .map(|dir| {
                    let full = if dir == "/" {
                        format!("/{}", f.name)
                    } else {
                        format!("{}/{}", dir, f.name)
                    };
                    full == path
                })
                .unwrap_or(false)
        }))
    }

    async fn get_files_by_keywords(
        &self,
        owner: Uuid,
        parents: &[Uuid],
        terms: &[String],
    ) -> StoreResult<Vec<File>> {
        let files = self.files.lock().unwrap();
        let mut hits: Vec<File> = files
            .values()
            .filter(|f| f.user_id == owner)
            .filter(|f| parents.is_empty() || parents.contains(&f.folder_id))
            .filter(|f| {
                let name = f.name.to_lowercase();
                terms.iter().any(|t| name.contains(&t.to_lowercase()))
            })
            .cloned()
            .collect();
        hits.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(hits)
    }

    async fn get_recursive_descendant_folders(
        &self,
        roots: &[Uuid],
        owner: Uuid,
    ) -> StoreResult<Vec<Uuid>> {
        let folders = self.folders.lock().unwrap();
        let mut found: Vec<Uuid> = roots
            .iter()
            .filter(|id| folders.get(id).is_some_and(|f| f.owner_id == owner))
            .copied()
            .collect();

        let mut i = 0;
        while i < found.len() {
            let parent = found[i];
            for folder in folders.values() {
                if folder.parent_id == Some(parent)
                    && folder.owner_id == owner
                    && !found.contains(&folder.id)
                {
                    found.push(folder.id);
                }
            }
            i += 1;
        }
        Ok(found)
    }

    async fn get_policy(&self, id: Uuid) -> StoreResult<Policy> {
        self.policies
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("policy {}", id)))
    }

    async fn get_folder_path(&self, folder_id: Uuid, _owner: Uuid) -> StoreResult<String> {
        self.folder_path(folder_id)
            .ok_or_else(|| StoreError::NotFound(format!("folder {}", folder_id)))
    }

    async fn delete_files(&self, ids: &[Uuid], owner: Uuid) -> StoreResult<u64> {
        let mut files = self.files.lock().unwrap();
        let mut removed = 0;
        for id in ids {
            if files.get(id).is_some_and(|f| f.user_id == owner) {
                files.remove(id);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn increase_user_storage(&self, user_id: Uuid, delta: u64) -> StoreResult<()> {
        *self.storage.lock().unwrap().entry(user_id).or_insert(0) += delta;
        Ok(())
    }

    async fn decrease_user_storage(&self, user_id: Uuid, delta: u64) -> StoreResult<()> {
        let mut storage = self.storage.lock().unwrap();
        let used = storage.entry(user_id).or_insert(0);
        *used = used.saturating_sub(delta);
        Ok(())
    }
}

#[derive(Default)]
pub struct StaticSettings {
    values: HashMap<String, i64>,
}

impl StaticSettings {
    pub fn with(mut self, key: &str, value: i64) -> Self {
        self.values.insert(key.to_string(), value);
        self
    }
}

#[async_trait]
impl SettingsStore for StaticSettings {
    async fn get_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub fn user(speed_limit: u64) -> User {
    User {
        id: Uuid::new_v4(),
        username: "alice".to_string(),
        storage: 0,
        group: Group {
            id: Uuid::new_v4(),
            name: "members".to_string(),
            speed_limit,
        },
    }
}

pub fn policy(directly_preview: bool, origin_link: bool) -> Policy {
    Policy {
        id: Uuid::new_v4(),
        name: "test".to_string(),
        is_directly_preview: directly_preview,
        is_origin_link_enable: origin_link,
        ..Policy::builtin_local()
    }
}

pub fn folder(owner: &User, name: &str, parent: Option<&Folder>) -> Folder {
    Folder {
        id: Uuid::new_v4(),
        owner_id: owner.id,
        name: name.to_string(),
        parent_id: parent.map(|p| p.id),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn file(owner: &User, folder: &Folder, policy: &Policy, name: &str, size: u64) -> File {
    File {
        id: Uuid::new_v4(),
        user_id: owner.id,
        name: name.to_string(),
        folder_id: folder.id,
        policy_id: policy.id,
        source_name: format!("uploads/{}/{}", owner.id, name),
        size,
        metadata: HashMap::new(),
        upload_session_id: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

pub fn upload_session(key: &str, policy: &Policy) -> UploadSession {
    UploadSession {
        key: key.to_string(),
        name: "partial.bin".to_string(),
        file_id: None,
        policy_id: policy.id,
        save_path: format!("uploads/{}", key),
        size: 100,
        upload_id: Some("mp-1".to_string()),
        expires_at: Utc::now() + chrono::Duration::hours(1),
    }
}

/// A user's world: stores, one root folder and a file system over them
pub struct World {
    pub user: User,
    pub root: Folder,
    pub store: Arc<MemoryFileStore>,
    pub sessions: Arc<MemorySessionStore>,
    pub deps: FsDeps,
}

impl World {
    pub fn new(
        user: User,
        store: MemoryFileStore,
        settings: StaticSettings,
        factory: StaticHandlerFactory,
    ) -> Self {
        let root = folder(&user, "/", None);
        store.add_folder(root.clone());
        let store = Arc::new(store);
        let sessions = Arc::new(MemorySessionStore::new(64));
        let deps = FsDeps {
            files: store.clone(),
            settings: Arc::new(settings),
            sessions: sessions.clone() as Arc<dyn SessionStore>,
            handlers: Arc::new(factory),
        };
        Self {
            user,
            root,
            store,
            sessions,
            deps,
        }
    }

    pub fn fs(&self) -> FileSystem {
        FileSystem::new(self.user.clone(), self.deps.clone(), FsOptions::default())
    }

    pub fn fs_with(&self, options: FsOptions) -> FileSystem {
        FileSystem::new(self.user.clone(), self.deps.clone(), options)
    }
}
