//! Repositories over the depot tables
//!
//! One repository per table. Rows are read into `*Row` structs and converted
//! to core models so column types never leak past this module.

mod file;
mod folder;
mod policy;
mod settings;
mod user;

pub use file::{FileRepository, FileRow};
pub use folder::FolderRepository;
pub use policy::{PolicyRepository, PolicyRow};
pub use settings::SettingsRepository;
pub use user::{UserRepository, UserRow};

use crate::error::StoreError;

/// Sizes are BIGINT in the schema; negative values are corrupt rows.
pub(crate) fn size_from_db(value: i64, column: &str) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("negative {}: {}", column, value)))
}

pub(crate) fn size_to_db(value: u64, column: &str) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidRecord(format!("{} out of range: {}", column, value)))
}
