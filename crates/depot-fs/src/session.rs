//! Upload sessions attached to files being deleted.
//!
//! Cancellation is best-effort: a backend that refuses to cancel is logged
//! and the deletion goes on.

use depot_core::models::{File, UploadSession};
use depot_storage::Handler;

use crate::context::OpContext;
use crate::filesystem::FileSystem;

impl FileSystem {
    /// Cached sessions referenced by `files`. Expired or evicted sessions are skipped.
    pub async fn collect_upload_sessions(&self, files: &[File]) -> Vec<UploadSession> {
        let mut sessions = Vec::new();
        for key in files.iter().filter_map(|f| f.upload_session_id.as_deref()) {
            if let Some(session) = self.sessions().get(key).await {
                sessions.push(session);
            }
        }
        sessions
    }

    /// Ask the backend to stop each upload, then evict the sessions.
    pub async fn cancel_upload_sessions(
        &self,
        ctx: &OpContext,
        handler: &dyn Handler,
        sessions: &[UploadSession],
    ) {
        if sessions.is_empty() {
            return;
        }

        let mut processed = Vec::with_capacity(sessions.len());
        for session in sessions {
            match ctx.run(handler.cancel_token(session)).await {
                Ok(Ok(())) => {
                    tracing::debug!(session = %session.key, "Upload session cancelled");
                }
                Ok(Err(e)) => {
                    tracing::warn!(
                        error = %e,
                        session = %session.key,
                        policy_id = %session.policy_id,
                        "Failed to cancel upload session"
                    );
                }
                Err(e) => {
                    // Sessions left untouched stay cached for a later attempt
                    tracing::warn!(
                        error = %e,
                        session = %session.key,
                        "Upload session cancellation interrupted"
                    );
                    break;
                }
            }
            processed.push(session.key.clone());
        }

        self.sessions().evict(&processed).await;
    }
}
