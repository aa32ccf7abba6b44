use depot_core::models::{Group, User};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use super::{size_from_db, size_to_db};
use crate::error::StoreError;

/// Row type for a user joined with its group (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub storage: i64,
    pub group_id: Uuid,
    pub group_name: String,
    pub speed_limit: i64,
}

impl UserRow {
    pub fn into_user(self) -> Result<User, StoreError> {
        Ok(User {
            id: self.id,
            username: self.username,
            storage: size_from_db(self.storage, "users.storage")?,
            group: Group {
                id: self.group_id,
                name: self.group_name,
                speed_limit: size_from_db(self.speed_limit, "groups.speed_limit")?,
            },
        })
    }
}

/// Repository for users table (storage accounting only)
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<Postgres, UserRow>(
            r#"
            SELECT u.id, u.username, u.storage, g.id AS group_id, g.name AS group_name, g.speed_limit
            FROM users u
            INNER JOIN groups g ON g.id = u.group_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    /// Add `delta` bytes to a user's used storage
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %user_id))]
    pub async fn increase_storage(&self, user_id: Uuid, delta: u64) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET storage = storage + $2 WHERE id = $1")
            .bind(user_id)
            .bind(size_to_db(delta, "users.storage")?)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }

        Ok(())
    }

    /// Subtract `delta` bytes from a user's used storage, clamped at zero
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "update", db.record_id = %user_id))]
    pub async fn decrease_storage(&self, user_id: Uuid, delta: u64) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET storage = GREATEST(storage - $2, 0) WHERE id = $1")
                .bind(user_id)
                .bind(size_to_db(delta, "users.storage")?)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }

        Ok(())
    }
}
