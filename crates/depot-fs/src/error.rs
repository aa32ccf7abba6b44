use depot_core::{ErrorMetadata, LogLevel};
use depot_db::StoreError;
use depot_storage::StorageError;
use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by file-system operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// Missing file, missing policy, or a file outside the required folder.
    /// These are deliberately indistinguishable.
    #[error("Object does not exist: {0}")]
    NotFound(String),

    #[error("Object already exists: {0}")]
    Conflict(String),

    #[error("File too large: {size} bytes exceeds the {limit} byte limit")]
    SizeLimitExceeded { size: u64, limit: u64 },

    #[error("Policy {0} does not allow source links")]
    PolicyNotAllowed(Uuid),

    #[error("Storage backend error: {0}")]
    BackendIo(#[source] StorageError),

    #[error("Failed to dispatch handler for policy {policy_id}: {reason}")]
    DispatchFailure { policy_id: Uuid, reason: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type FsResult<T> = Result<T, FsError>;

/// (status, code, recoverable, sensitive, log level)
fn fs_error_static_metadata(err: &FsError) -> (u16, &'static str, bool, bool, LogLevel) {
    match err {
        FsError::NotFound(_) => (404, "OBJECT_NOT_EXIST", false, false, LogLevel::Debug),
        FsError::Conflict(_) => (409, "OBJECT_EXIST", false, false, LogLevel::Debug),
        FsError::SizeLimitExceeded { .. } => (413, "FILE_TOO_LARGE", false, false, LogLevel::Debug),
        FsError::PolicyNotAllowed(_) => (403, "POLICY_NOT_ALLOWED", false, false, LogLevel::Warn),
        FsError::BackendIo(_) => (500, "IO_FAILED", true, true, LogLevel::Error),
        FsError::DispatchFailure { .. } => (500, "POLICY_NOT_RESOLVABLE", false, true, LogLevel::Error),
        FsError::Store(_) => (500, "DATABASE_ERROR", true, true, LogLevel::Error),
        FsError::Cancelled => (499, "CANCELLED", true, false, LogLevel::Debug),
    }
}

impl ErrorMetadata for FsError {
    fn http_status_code(&self) -> u16 {
        fs_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        fs_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        fs_error_static_metadata(self).2
    }

    fn client_message(&self) -> String {
        match self {
            FsError::NotFound(_) => "Object does not exist".to_string(),
            FsError::Conflict(ref name) => format!("Object already exists: {}", name),
            FsError::SizeLimitExceeded { .. } => self.to_string(),
            FsError::PolicyNotAllowed(_) => {
                "This policy is not enabled for getting source link".to_string()
            }
            FsError::BackendIo(_) => "Failed to access storage".to_string(),
            FsError::DispatchFailure { .. } => "Storage policy is not available".to_string(),
            FsError::Store(_) => "Failed to access database".to_string(),
            FsError::Cancelled => "Operation cancelled".to_string(),
        }
    }

    fn is_sensitive(&self) -> bool {
        fs_error_static_metadata(self).3
    }

    fn log_level(&self) -> LogLevel {
        fs_error_static_metadata(self).4
    }
}
