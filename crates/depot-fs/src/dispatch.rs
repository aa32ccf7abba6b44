//! Policy dispatch
//!
//! A [`Binding`] pairs a policy with the handler serving it. Bindings are
//! values: each resolve step produces a fresh one instead of mutating the
//! file system in place.

use depot_core::models::Policy;
use depot_core::ExecutionMode;
use depot_db::FileStore;
use depot_storage::{Handler, HandlerFactory};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{FsError, FsResult};

/// A policy and the handler bound to it
#[derive(Clone)]
pub struct Binding {
    pub policy: Arc<Policy>,
    pub handler: Arc<dyn Handler>,
}

impl Binding {
    pub fn new(policy: Policy, handler: Arc<dyn Handler>) -> Self {
        Self {
            policy: Arc::new(policy),
            handler,
        }
    }

    pub fn policy_id(&self) -> Uuid {
        self.policy.id
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("policy_id", &self.policy.id)
            .field("kind", &self.handler.kind())
            .finish()
    }
}

/// Builds the binding for a policy.
///
/// In slave mode every dispatch returns the binding the process was started
/// with: a slave serves exactly one backend and re-dispatch must not replace it.
#[derive(Clone)]
pub struct Dispatcher {
    mode: ExecutionMode,
    files: Arc<dyn FileStore>,
    handlers: Arc<dyn HandlerFactory>,
    fixed: Option<Binding>,
}

impl Dispatcher {
    pub fn new(
        mode: ExecutionMode,
        files: Arc<dyn FileStore>,
        handlers: Arc<dyn HandlerFactory>,
        fixed: Option<Binding>,
    ) -> Self {
        Self {
            mode,
            files,
            handlers,
            fixed,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    /// Binding for the policy with `policy_id`
    pub async fn dispatch(&self, policy_id: Uuid) -> FsResult<Binding> {
        if let Some(binding) = self.slave_binding(policy_id)? {
            return Ok(binding);
        }

        let policy = self
            .files
            .get_policy(policy_id)
            .await
            .map_err(|e| FsError::DispatchFailure {
                policy_id,
                reason: e.to_string(),
            })?;

        self.build(policy).await
    }

    /// Binding for a policy the caller already holds
    pub async fn dispatch_policy(&self, policy: Policy) -> FsResult<Binding> {
        if let Some(binding) = self.slave_binding(policy.id)? {
            return Ok(binding);
        }

        self.build(policy).await
    }

    fn slave_binding(&self, policy_id: Uuid) -> FsResult<Option<Binding>> {
        if self.mode != ExecutionMode::Slave {
            return Ok(None);
        }

        match self.fixed {
            Some(ref binding) => Ok(Some(binding.clone())),
            None => Err(FsError::DispatchFailure {
                policy_id,
                reason: "slave mode requires a fixed handler binding".to_string(),
            }),
        }
    }

    async fn build(&self, policy: Policy) -> FsResult<Binding> {
        let handler = self
            .handlers
            .build(&policy)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    policy_id = %policy.id,
                    kind = %policy.kind,
                    "Failed to build storage handler"
                );
                FsError::DispatchFailure {
                    policy_id: policy.id,
                    reason: e.to_string(),
                }
            })?;

        Ok(Binding::new(policy, handler))
    }
}
