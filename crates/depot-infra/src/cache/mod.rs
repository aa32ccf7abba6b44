//! Upload-session side cache
//!
//! In-flight upload sessions live here with a bounded lifetime, keyed by
//! [`session_cache_key`]. The cache is shared process-wide, so every
//! implementation must tolerate concurrent reads and evictions.

mod memory;

pub use memory::MemorySessionStore;

use async_trait::async_trait;
use depot_core::constants::UPLOAD_SESSION_CACHE_PREFIX;
use depot_core::models::UploadSession;

/// Cache key of an upload session
pub fn session_cache_key(session_key: &str) -> String {
    format!("{}{}", UPLOAD_SESSION_CACHE_PREFIX, session_key)
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// A live session by its key, `None` when absent or expired.
    async fn get(&self, session_key: &str) -> Option<UploadSession>;

    async fn put(&self, session: UploadSession);

    /// Evict sessions by key. Absent keys are ignored.
    async fn evict(&self, session_keys: &[String]);
}
