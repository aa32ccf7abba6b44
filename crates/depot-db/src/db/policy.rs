use depot_core::models::Policy;
use depot_core::PolicyKind;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::error::StoreError;

/// Row type for policies table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct PolicyRow {
    pub id: Uuid,
    pub name: String,
    pub kind: String,
    pub server: Option<String>,
    pub bucket_name: Option<String>,
    pub region: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub root_path: Option<String>,
    pub base_url: Option<String>,
    pub is_directly_preview: bool,
    pub is_origin_link_enable: bool,
}

impl PolicyRow {
    pub fn into_policy(self) -> Result<Policy, StoreError> {
        let kind: PolicyKind = self
            .kind
            .parse()
            .map_err(|e| StoreError::InvalidRecord(format!("policy {}: {}", self.id, e)))?;

        Ok(Policy {
            id: self.id,
            name: self.name,
            kind,
            server: self.server,
            bucket_name: self.bucket_name,
            region: self.region,
            access_key: self.access_key,
            secret_key: self.secret_key,
            root_path: self.root_path,
            base_url: self.base_url,
            is_directly_preview: self.is_directly_preview,
            is_origin_link_enable: self.is_origin_link_enable,
        })
    }
}

/// Repository for policies table.
#[derive(Clone)]
pub struct PolicyRepository {
    pool: PgPool,
}

impl PolicyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self), fields(db.table = "policies", db.operation = "select", db.record_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<Option<Policy>, StoreError> {
        let row = sqlx::query_as::<Postgres, PolicyRow>(
            r#"
            SELECT id, name, kind, server, bucket_name, region, access_key, secret_key,
                   root_path, base_url, is_directly_preview, is_origin_link_enable
            FROM policies
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(PolicyRow::into_policy).transpose()
    }
}
