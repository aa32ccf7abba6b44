use async_trait::async_trait;
use chrono::Utc;
use depot_core::models::UploadSession;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use super::{session_cache_key, SessionStore};

const MIN_CAPACITY: NonZeroUsize = NonZeroUsize::MIN;

/// In-process session cache: LRU-bounded, entries expire at the session's
/// own `expires_at`.
pub struct MemorySessionStore {
    entries: Mutex<LruCache<String, UploadSession>>,
}

impl MemorySessionStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(MIN_CAPACITY);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_key: &str) -> Option<UploadSession> {
        let key = session_cache_key(session_key);
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        let expired = entries.get(&key)?.is_expired(Utc::now());
        if expired {
            entries.pop(&key);
            tracing::debug!(session = %session_key, "Upload session expired");
            return None;
        }

        entries.get(&key).cloned()
    }

    async fn put(&self, session: UploadSession) {
        let key = session_cache_key(&session.key);
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.put(key, session);
    }

    async fn evict(&self, session_keys: &[String]) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut evicted = 0usize;
        for session_key in session_keys {
            if entries.pop(&session_cache_key(session_key)).is_some() {
                evicted += 1;
            }
        }

        tracing::debug!(
            requested = session_keys.len(),
            evicted,
            "Upload sessions evicted"
        );
    }
}
