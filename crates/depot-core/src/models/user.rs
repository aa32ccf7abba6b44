use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User group; carries the download throughput cap shared by its members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    /// Bytes per second, 0 = unlimited
    pub speed_limit: u64,
}

/// The user an operation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// Bytes currently accounted to this user
    pub storage: u64,
    pub group: Group,
}
