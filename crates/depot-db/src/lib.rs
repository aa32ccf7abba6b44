//! Depot database layer
//!
//! The narrow store contracts the file-system core consumes (`FileStore`,
//! `SettingsStore`) and their PostgreSQL implementations. Owner scoping is
//! enforced here, at the store boundary, never by callers.

pub mod db;
pub mod error;
pub mod store;
pub mod traits;

pub use db::{
    FileRepository, FolderRepository, PolicyRepository, SettingsRepository, UserRepository,
};
pub use error::{StoreError, StoreResult};
pub use store::{PgFileStore, PgSettingsStore};
pub use traits::{FileStore, SettingsStore};

/// Embedded schema migrations
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

/// Open a connection pool and bring the schema up to date.
pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<sqlx::PgPool> {
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    MIGRATOR
        .run(&pool)
        .await
        .map_err(|e| StoreError::Migration(e.to_string()))?;

    tracing::info!(max_connections, "Database pool ready");
    Ok(pool)
}
