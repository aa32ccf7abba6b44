use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// In-flight upload, cached with a limited lifetime outside the relational store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSession {
    pub key: String,
    /// Display name of the file being uploaded
    pub name: String,
    pub file_id: Option<Uuid>,
    pub policy_id: Uuid,
    /// Locator the upload writes to
    pub save_path: String,
    pub size: u64,
    /// Backend multipart / session identifier, if the backend issued one
    pub upload_id: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl UploadSession {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
