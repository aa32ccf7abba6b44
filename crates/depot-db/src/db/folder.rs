use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::error::StoreError;

/// Repository for folders table
#[derive(Clone)]
pub struct FolderRepository {
    pool: PgPool,
}

impl FolderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The owner's root folder id
    #[tracing::instrument(skip(self), fields(db.table = "folders", db.operation = "select"))]
    pub async fn get_root(&self, owner: Uuid) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT id FROM folders WHERE owner_id = $1 AND parent_id IS NULL ORDER BY created_at ASC LIMIT 1",
        )
        .bind(owner)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Child folder of `parent` named `name` (owner-scoped)
    #[tracing::instrument(skip(self), fields(db.table = "folders", db.operation = "select"))]
    pub async fn get_child(
        &self,
        owner: Uuid,
        parent: Uuid,
        name: &str,
    ) -> Result<Option<Uuid>, StoreError> {
        let id = sqlx::query_scalar::<Postgres, Uuid>(
            "SELECT id FROM folders WHERE owner_id = $1 AND parent_id = $2 AND name = $3",
        )
        .bind(owner)
        .bind(parent)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(id)
    }

    /// Walk `/a/b/c` from the owner's root folder. `None` when any segment is missing.
    pub async fn get_by_path(&self, owner: Uuid, path: &str) -> Result<Option<Uuid>, StoreError> {
        let Some(mut current) = self.get_root(owner).await? else {
            return Ok(None);
        };

        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match self.get_child(owner, current, segment).await? {
                Some(id) => current = id,
                None => return Ok(None),
            }
        }

        Ok(Some(current))
    }

    /// Ids of `roots` and all their descendants (owner-scoped)
    #[tracing::instrument(skip(self, roots), fields(db.table = "folders", db.operation = "select", roots = roots.len()))]
    pub async fn get_descendants(
        &self,
        roots: &[Uuid],
        owner: Uuid,
    ) -> Result<Vec<Uuid>, StoreError> {
        let ids = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            WITH RECURSIVE folder_tree AS (
                SELECT id
                FROM folders
                WHERE id = ANY($1) AND owner_id = $2
                UNION
                SELECT f.id
                FROM folders f
                INNER JOIN folder_tree ft ON f.parent_id = ft.id
                WHERE f.owner_id = $2
            )
            SELECT id FROM folder_tree
            "#,
        )
        .bind(roots)
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Virtual path of a folder, built from its ancestors' names
    #[tracing::instrument(skip(self), fields(db.table = "folders", db.operation = "select", db.record_id = %folder_id))]
    pub async fn get_path(&self, folder_id: Uuid, owner: Uuid) -> Result<String, StoreError> {
        let names = sqlx::query_scalar::<Postgres, String>(
            r#"
            WITH RECURSIVE ancestors AS (
                SELECT id, parent_id, name, 0 AS depth
                FROM folders
                WHERE id = $1 AND owner_id = $2
                UNION ALL
                SELECT f.id, f.parent_id, f.name, a.depth + 1
                FROM folders f
                INNER JOIN ancestors a ON f.id = a.parent_id
                WHERE f.owner_id = $2
            )
            SELECT name FROM ancestors WHERE parent_id IS NOT NULL ORDER BY depth DESC
            "#,
        )
        .bind(folder_id)
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        Ok(format!("/{}", names.join("/")))
    }
}
