use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    File,
    Dir,
}

/// One entry of a listing returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Object {
    pub id: Uuid,
    pub name: String,
    pub path: String,
    pub thumb: bool,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    pub date: DateTime<Utc>,
    pub create_date: DateTime<Utc>,
    pub source_enabled: bool,
}
