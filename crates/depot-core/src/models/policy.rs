//! Storage policy: which backend holds a file's bytes and how it may be served.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage_types::PolicyKind;

/// A storage policy. Immutable once files have been assigned to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub kind: PolicyKind,
    /// Endpoint for object stores, node URL for slave nodes
    pub server: Option<String>,
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    /// Root directory on disk for local policies
    pub root_path: Option<String>,
    /// Base URL public (ttl-less) links are built from
    pub base_url: Option<String>,
    /// Stream content through the server instead of redirecting to a signed link
    pub is_directly_preview: bool,
    /// Permit non-expiring source links
    pub is_origin_link_enable: bool,
}

impl Policy {
    /// The built-in local policy used to read files by physical path.
    ///
    /// It has the nil id so it can never collide with a stored policy.
    pub fn builtin_local() -> Self {
        Self {
            id: Uuid::nil(),
            name: "builtin-local".to_string(),
            kind: PolicyKind::Local,
            server: None,
            bucket_name: None,
            region: None,
            access_key: None,
            secret_key: None,
            root_path: None,
            base_url: None,
            is_directly_preview: true,
            is_origin_link_enable: false,
        }
    }
}
