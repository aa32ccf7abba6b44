use depot_core::models::Folder;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::error::{FsError, FsResult};

/// Per-call context: caller cancellation and an optional parent-folder constraint.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    pub cancel: CancellationToken,
    /// Resolved files must live directly in this folder
    pub limit_parent: Option<Folder>,
}

impl OpContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            limit_parent: None,
        }
    }

    pub fn with_limit_parent(mut self, folder: Folder) -> Self {
        self.limit_parent = Some(folder);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run a handler call, giving up with [`FsError::Cancelled`] if the caller
    /// cancels first.
    pub async fn run<F, T>(&self, call: F) -> FsResult<T>
    where
        F: Future<Output = T>,
    {
        if self.cancel.is_cancelled() {
            return Err(FsError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FsError::Cancelled),
            out = call => Ok(out),
        }
    }
}
