use chrono::{DateTime, Utc};
use depot_core::models::File;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

use super::{size_from_db, size_to_db};
use crate::error::StoreError;

const FILE_COLUMNS: &str = "id, user_id, name, folder_id, policy_id, source_name, size, metadata, upload_session_id, created_at, updated_at";

/// Row type for files table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct FileRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub folder_id: Uuid,
    pub policy_id: Uuid,
    pub source_name: String,
    pub size: i64,
    pub metadata: Json<HashMap<String, String>>,
    pub upload_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRow {
    pub fn into_file(self) -> Result<File, StoreError> {
        Ok(File {
            id: self.id,
            user_id: self.user_id,
            name: self.name,
            folder_id: self.folder_id,
            policy_id: self.policy_id,
            source_name: self.source_name,
            size: size_from_db(self.size, "files.size")?,
            metadata: self.metadata.0,
            upload_session_id: self.upload_session_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_files(rows: Vec<FileRow>) -> Result<Vec<File>, StoreError> {
    rows.into_iter().map(FileRow::into_file).collect()
}

/// Repository for files table.
#[derive(Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a file record. The (folder_id, name) unique index turns a
    /// duplicate into `StoreError::Conflict`.
    #[tracing::instrument(skip(self, file), fields(db.table = "files", db.operation = "insert", db.record_id = %file.id))]
    pub async fn create(&self, file: &File) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO files (id, user_id, name, folder_id, policy_id, source_name, size, metadata, upload_session_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(file.id)
        .bind(file.user_id)
        .bind(&file.name)
        .bind(file.folder_id)
        .bind(file.policy_id)
        .bind(&file.source_name)
        .bind(size_to_db(file.size, "files.size")?)
        .bind(Json(&file.metadata))
        .bind(&file.upload_session_id)
        .bind(file.created_at)
        .bind(file.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Get files by id (owner-scoped). Unknown ids are skipped.
    #[tracing::instrument(skip(self, ids), fields(db.table = "files", db.operation = "select", count = ids.len()))]
    pub async fn get_by_ids(&self, ids: &[Uuid], owner: Uuid) -> Result<Vec<File>, StoreError> {
        let rows = sqlx::query_as::<Postgres, FileRow>(&format!(
            "SELECT {} FROM files WHERE id = ANY($1) AND user_id = $2 ORDER BY created_at ASC",
            FILE_COLUMNS
        ))
        .bind(ids)
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        into_files(rows)
    }

    /// Get a file by name inside a folder (owner-scoped)
    #[tracing::instrument(skip(self), fields(db.table = "files", db.operation = "select"))]
    pub async fn get_in_folder(
        &self,
        owner: Uuid,
        folder_id: Uuid,
        name: &str,
    ) -> Result<Option<File>, StoreError> {
        let row = sqlx::query_as::<Postgres, FileRow>(&format!(
            "SELECT {} FROM files WHERE user_id = $1 AND folder_id = $2 AND name = $3",
            FILE_COLUMNS
        ))
        .bind(owner)
        .bind(folder_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileRow::into_file).transpose()
    }

    /// Delete files by id (owner-scoped). Unknown or foreign ids are skipped.
    #[tracing::instrument(skip(self, ids), fields(db.table = "files", db.operation = "delete", count = ids.len()))]
    pub async fn delete_by_ids(&self, ids: &[Uuid], owner: Uuid) -> Result<u64, StoreError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM files WHERE id = ANY($1) AND user_id = $2")
            .bind(ids)
            .bind(owner)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Files whose name contains any of `terms` (case-insensitive), optionally
    /// restricted to `parents`.
    #[tracing::instrument(skip(self, parents, terms), fields(db.table = "files", db.operation = "select", scoped = !parents.is_empty()))]
    pub async fn search(
        &self,
        owner: Uuid,
        parents: &[Uuid],
        terms: &[String],
    ) -> Result<Vec<File>, StoreError> {
        let patterns: Vec<String> = terms
            .iter()
            .map(|term| format!("%{}%", escape_like(term)))
            .collect();

        let rows = if parents.is_empty() {
            sqlx::query_as::<Postgres, FileRow>(&format!(
                "SELECT {} FROM files WHERE user_id = $1 AND name ILIKE ANY($2) ORDER BY name ASC",
                FILE_COLUMNS
            ))
            .bind(owner)
            .bind(&patterns)
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query_as::<Postgres, FileRow>(&format!(
                "SELECT {} FROM files WHERE user_id = $1 AND folder_id = ANY($2) AND name ILIKE ANY($3) ORDER BY name ASC",
                FILE_COLUMNS
            ))
            .bind(owner)
            .bind(parents)
            .bind(&patterns)
            .fetch_all(&self.pool)
            .await?
        };

        into_files(rows)
    }
}

/// Escape LIKE wildcards so search terms match literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn row_converts_to_file() {
        let now = Utc::now();
        let row = FileRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "a.txt".to_string(),
            folder_id: Uuid::new_v4(),
            policy_id: Uuid::new_v4(),
            source_name: "u/a.txt".to_string(),
            size: 12,
            metadata: Json(HashMap::from([("thumb_sidecar".to_string(), "1".to_string())])),
            upload_session_id: None,
            created_at: now,
            updated_at: now,
        };

        let file = row.into_file().unwrap();
        assert_eq!(file.size, 12);
        assert!(file.has_sidecar_thumb());
    }
}
