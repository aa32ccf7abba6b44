use sqlx::{PgPool, Postgres};

use crate::error::StoreError;

/// Repository for settings table
#[derive(Clone)]
pub struct SettingsRepository {
    pool: PgPool,
}

impl SettingsRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "settings", db.operation = "select"))]
    pub async fn get(&self, name: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<Postgres, String>("SELECT value FROM settings WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }
}
