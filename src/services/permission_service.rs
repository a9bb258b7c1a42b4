//! Read-side queries over the persisted permission taxonomy.

use sqlx::PgPool;

use super::ServiceError;
use crate::database::models::{Permission, Section};

pub struct PermissionService {
    pool: PgPool,
}

impl PermissionService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn all_sections(&self) -> Result<Vec<Section>, ServiceError> {
        let rows = sqlx::query_as::<_, Section>("SELECT id, name FROM sections ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn all_permissions(&self) -> Result<Vec<Permission>, ServiceError> {
        let rows = sqlx::query_as::<_, Permission>(
            "SELECT id, name, section_id FROM permissions ORDER BY name ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn search_permissions(
        &self,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Permission>, ServiceError> {
        let rows = sqlx::query_as::<_, Permission>(
            "SELECT id, name, section_id FROM permissions ORDER BY name ASC OFFSET $1 LIMIT $2",
        )
        .bind(offset)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn find_permission_by_id(&self, id: i64) -> Result<Option<Permission>, ServiceError> {
        let row = sqlx::query_as::<_, Permission>(
            "SELECT id, name, section_id FROM permissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn find_permission_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Permission>, ServiceError> {
        let row = sqlx::query_as::<_, Permission>(
            "SELECT id, name, section_id FROM permissions WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}
