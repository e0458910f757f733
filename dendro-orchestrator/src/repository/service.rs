//! Service lookups
//!
//! Services are administered outside the broker; the orchestrator only
//! reads them to evaluate authorization predicates.

use async_trait::async_trait;
use dendro_core::domain::service::Service;
use sqlx::PgPool;
use sqlx::types::Json;

use super::StoreError;

#[async_trait]
pub trait ServiceDirectory: Send + Sync {
    async fn find_service(&self, service_name: &str) -> Result<Option<Service>, StoreError>;
}

#[derive(Clone)]
pub struct PgServiceDirectory {
    pool: PgPool,
}

impl PgServiceDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ServiceDirectory for PgServiceDirectory {
    async fn find_service(&self, service_name: &str) -> Result<Option<Service>, StoreError> {
        let row = sqlx::query_scalar::<_, Json<Service>>(
            "SELECT doc FROM services WHERE service_name = $1",
        )
        .bind(service_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| r.0))
    }
}
