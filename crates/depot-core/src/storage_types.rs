use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage backend kinds a policy can point at.
///
/// Defined in core because policies, configuration and the database all carry it.
/// Adding a backend means adding a variant here and a handler in depot-storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    Local,
    Remote,
    S3,
}

impl FromStr for PolicyKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(PolicyKind::Local),
            "remote" | "slave" => Ok(PolicyKind::Remote),
            "s3" => Ok(PolicyKind::S3),
            _ => Err(anyhow::anyhow!("Invalid policy kind: {}", s)),
        }
    }
}

impl Display for PolicyKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            PolicyKind::Local => write!(f, "local"),
            PolicyKind::Remote => write!(f, "remote"),
            PolicyKind::S3 => write!(f, "s3"),
        }
    }
}
