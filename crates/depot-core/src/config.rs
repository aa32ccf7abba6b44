//! Configuration module
//!
//! Process-level settings read from the environment (and `.env`). Values that
//! administrators tune at runtime (edit size cap, link ttls) are not here; they
//! come from the settings store.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::DEFAULT_THUMB_FILE_SUFFIX;

const DELETE_CONCURRENCY: usize = 1;
const UPLOAD_SESSION_CACHE_CAPACITY: usize = 10_000;
const DB_MAX_CONNECTIONS: u32 = 10;

/// Which role this process plays.
///
/// A slave node serves one backend directly and never re-dispatches handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Master,
    Slave,
}

impl FromStr for ExecutionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "master" => Ok(ExecutionMode::Master),
            "slave" => Ok(ExecutionMode::Slave),
            _ => Err(anyhow::anyhow!("Invalid DEPOT_MODE: {}", s)),
        }
    }
}

impl Display for ExecutionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ExecutionMode::Master => write!(f, "master"),
            ExecutionMode::Slave => write!(f, "slave"),
        }
    }
}

/// How grouped deletion treats a batch-delete call that returns an error
/// alongside its failed-locator list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteErrorMode {
    /// Only the failed-locator list is authoritative; the error is logged.
    #[default]
    TrustFailedList,
    /// Any error marks every primary locator of the group as failed.
    FailGroup,
}

impl FromStr for DeleteErrorMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trust-failed-list" => Ok(DeleteErrorMode::TrustFailedList),
            "fail-group" => Ok(DeleteErrorMode::FailGroup),
            _ => Err(anyhow::anyhow!("Invalid DELETE_ERROR_MODE: {}", s)),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct DepotConfig {
    pub mode: ExecutionMode,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    /// HMAC key for links issued by local and slave handlers
    pub signing_secret: String,
    /// Public base URL local signed links point at
    pub site_url: String,
    pub local_storage_path: String,
    /// Shared secret for requests to slave nodes
    pub slave_secret: Option<String>,
    pub thumb_file_suffix: String,
    /// Number of policy groups deleted in parallel (1 = sequential)
    pub delete_concurrency: usize,
    pub delete_error_mode: DeleteErrorMode,
    pub upload_session_cache_capacity: usize,
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Master,
            database_url: None,
            db_max_connections: DB_MAX_CONNECTIONS,
            signing_secret: String::new(),
            site_url: "http://localhost:5212".to_string(),
            local_storage_path: "uploads".to_string(),
            slave_secret: None,
            thumb_file_suffix: DEFAULT_THUMB_FILE_SUFFIX.to_string(),
            delete_concurrency: DELETE_CONCURRENCY,
            delete_error_mode: DeleteErrorMode::TrustFailedList,
            upload_session_cache_capacity: UPLOAD_SESSION_CACHE_CAPACITY,
        }
    }
}

impl DepotConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let defaults = DepotConfig::default();

        let mode = match env::var("DEPOT_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => ExecutionMode::Master,
        };

        let delete_error_mode = match env::var("DELETE_ERROR_MODE") {
            Ok(value) => value.parse()?,
            Err(_) => DeleteErrorMode::TrustFailedList,
        };

        let config = DepotConfig {
            mode,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| DB_MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(DB_MAX_CONNECTIONS),
            signing_secret: env::var("SIGNING_SECRET")
                .map_err(|_| anyhow::anyhow!("SIGNING_SECRET must be set"))?,
            site_url: env::var("SITE_URL").unwrap_or(defaults.site_url),
            local_storage_path: env::var("LOCAL_STORAGE_PATH")
                .unwrap_or(defaults.local_storage_path),
            slave_secret: env::var("SLAVE_SECRET").ok().filter(|s| !s.is_empty()),
            thumb_file_suffix: env::var("THUMB_FILE_SUFFIX")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.thumb_file_suffix),
            delete_concurrency: env::var("DELETE_CONCURRENCY")
                .unwrap_or_else(|_| DELETE_CONCURRENCY.to_string())
                .parse()
                .unwrap_or(DELETE_CONCURRENCY),
            delete_error_mode,
            upload_session_cache_capacity: env::var("UPLOAD_SESSION_CACHE_CAPACITY")
                .unwrap_or_else(|_| UPLOAD_SESSION_CACHE_CAPACITY.to_string())
                .parse()
                .unwrap_or(UPLOAD_SESSION_CACHE_CAPACITY),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.signing_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "SIGNING_SECRET must be at least 32 characters long"
            ));
        }

        if self.delete_concurrency == 0 {
            return Err(anyhow::anyhow!("DELETE_CONCURRENCY must be at least 1"));
        }

        if let Some(ref url) = self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.mode == ExecutionMode::Master && self.database_url.is_none() {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be set when running in master mode"
            ));
        }

        Ok(())
    }

    pub fn is_slave(&self) -> bool {
        self.mode == ExecutionMode::Slave
    }
}
