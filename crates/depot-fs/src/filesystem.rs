use depot_core::models::User;
use depot_core::{DeleteErrorMode, DepotConfig, ExecutionMode};
use depot_db::{FileStore, SettingsStore};
use depot_infra::SessionStore;
use depot_storage::HandlerFactory;
use std::sync::Arc;
use uuid::Uuid;

use crate::dispatch::{Binding, Dispatcher};
use crate::error::FsResult;

/// Collaborators a file system talks to. Cheap to clone and share across users.
#[derive(Clone)]
pub struct FsDeps {
    pub files: Arc<dyn FileStore>,
    pub settings: Arc<dyn SettingsStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub handlers: Arc<dyn HandlerFactory>,
}

/// Process-level knobs taken from [`DepotConfig`]
#[derive(Debug, Clone)]
pub struct FsOptions {
    pub mode: ExecutionMode,
    pub thumb_file_suffix: String,
    pub delete_concurrency: usize,
    pub delete_error_mode: DeleteErrorMode,
}

impl Default for FsOptions {
    fn default() -> Self {
        Self::from(&DepotConfig::default())
    }
}

impl From<&DepotConfig> for FsOptions {
    fn from(config: &DepotConfig) -> Self {
        Self {
            mode: config.mode,
            thumb_file_suffix: config.thumb_file_suffix.clone(),
            delete_concurrency: config.delete_concurrency.max(1),
            delete_error_mode: config.delete_error_mode,
        }
    }
}

/// File operations on behalf of one user.
///
/// Holds no per-operation state: every call resolves and dispatches on its
/// own, so one instance may serve concurrent calls.
pub struct FileSystem {
    user: User,
    deps: FsDeps,
    options: FsOptions,
    dispatcher: Dispatcher,
}

impl FileSystem {
    /// File system for a master node; handlers are dispatched per file policy.
    pub fn new(user: User, deps: FsDeps, options: FsOptions) -> Self {
        let dispatcher = Dispatcher::new(
            options.mode,
            deps.files.clone(),
            deps.handlers.clone(),
            None,
        );
        Self {
            user,
            deps,
            options,
            dispatcher,
        }
    }

    /// File system for a slave node serving one backend through `binding`.
    pub fn slave(user: User, deps: FsDeps, options: FsOptions, binding: Binding) -> Self {
        let options = FsOptions {
            mode: ExecutionMode::Slave,
            ..options
        };
        let dispatcher = Dispatcher::new(
            options.mode,
            deps.files.clone(),
            deps.handlers.clone(),
            Some(binding),
        );
        Self {
            user,
            deps,
            options,
            dispatcher,
        }
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn options(&self) -> &FsOptions {
        &self.options
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Binding for a policy, for operations that pick the policy themselves
    /// (uploads).
    pub async fn bind_policy(&self, policy_id: Uuid) -> FsResult<Binding> {
        self.dispatcher.dispatch(policy_id).await
    }

    pub(crate) fn files(&self) -> &dyn FileStore {
        self.deps.files.as_ref()
    }

    pub(crate) fn settings(&self) -> &dyn SettingsStore {
        self.deps.settings.as_ref()
    }

    pub(crate) fn sessions(&self) -> &dyn SessionStore {
        self.deps.sessions.as_ref()
    }
}
