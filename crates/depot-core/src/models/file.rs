use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::constants::{is_true_val, THUMB_SIDECAR_METADATA_KEY};

/// A logical file: owned by a user, placed in a folder, stored by one policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub folder_id: Uuid,
    pub policy_id: Uuid,
    /// Backend-specific locator of the stored bytes
    pub source_name: String,
    pub size: u64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub upload_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl File {
    /// Whether a sidecar thumbnail was generated next to the source object.
    pub fn has_sidecar_thumb(&self) -> bool {
        self.metadata
            .get(THUMB_SIDECAR_METADATA_KEY)
            .is_some_and(|v| is_true_val(v))
    }

    /// Locator of the sidecar thumbnail for this file.
    pub fn thumb_file(&self, suffix: &str) -> String {
        format!("{}{}", self.source_name, suffix)
    }
}

/// What an upload hands over when its content has been accepted by a backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadInfo {
    pub file_name: String,
    /// Locator the backend stored the bytes under
    pub save_path: String,
    pub size: u64,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub upload_session_id: Option<String>,
}
