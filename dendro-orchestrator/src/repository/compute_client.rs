//! Compute Client Repository

use async_trait::async_trait;
use dendro_core::domain::compute_client::ComputeClient;
use dendro_core::patch::ComputeClientPatch;
use sqlx::PgPool;
use sqlx::types::Json;

use super::StoreError;

#[async_trait]
pub trait ComputeClientStore: Send + Sync {
    async fn insert(&self, client: &ComputeClient) -> Result<(), StoreError>;

    async fn find_by_id(
        &self,
        compute_client_id: &str,
    ) -> Result<Option<ComputeClient>, StoreError>;

    async fn update(
        &self,
        compute_client_id: &str,
        patch: &ComputeClientPatch,
    ) -> Result<bool, StoreError>;

    async fn delete(&self, compute_client_id: &str) -> Result<bool, StoreError>;
}

/// Postgres-backed compute client store
#[derive(Clone)]
pub struct PgComputeClientStore {
    pool: PgPool,
}

impl PgComputeClientStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComputeClientStore for PgComputeClientStore {
    async fn insert(&self, client: &ComputeClient) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO compute_clients (compute_client_id, doc) VALUES ($1, $2)")
            .bind(&client.compute_client_id)
            .bind(Json(client))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn find_by_id(
        &self,
        compute_client_id: &str,
    ) -> Result<Option<ComputeClient>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<ComputeClient>>(
            "SELECT doc FROM compute_clients WHERE compute_client_id = $1",
        )
        .bind(compute_client_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }

    async fn update(
        &self,
        compute_client_id: &str,
        patch: &ComputeClientPatch,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE compute_clients SET doc = doc || $2 WHERE compute_client_id = $1",
        )
        .bind(compute_client_id)
        .bind(Json(patch.to_document()))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, compute_client_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM compute_clients WHERE compute_client_id = $1")
            .bind(compute_client_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
