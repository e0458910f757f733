//! User identity lookups

use async_trait::async_trait;
use sqlx::PgPool;

use super::StoreError;

/// Maps an API token to the user it belongs to
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, token: &str) -> Result<Option<String>, StoreError>;
}

#[derive(Clone)]
pub struct PgIdentityResolver {
    pool: PgPool,
}

impl PgIdentityResolver {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdentityResolver for PgIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Option<String>, StoreError> {
        let user_id =
            sqlx::query_scalar::<_, String>("SELECT user_id FROM users WHERE api_key = $1")
                .bind(token)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user_id)
    }
}
