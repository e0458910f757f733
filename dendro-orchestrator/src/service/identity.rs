//! Identity Service
//!
//! Resolves bearer tokens to users, with a bounded, expiring cache in front
//! of the backing resolver.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;

use super::error::{Result, ServiceError};
use crate::repository::{IdentityResolver, StoreError};
use crate::state::AppState;

/// LRU + TTL cache over another [`IdentityResolver`]
///
/// Only successful lookups are cached, so a newly issued token works
/// immediately and a revoked one stops working within the TTL.
pub struct CachedIdentityResolver {
    inner: Arc<dyn IdentityResolver>,
    cache: Mutex<LruCache<String, (String, Instant)>>,
    ttl: Duration,
}

impl CachedIdentityResolver {
    pub fn new(inner: Arc<dyn IdentityResolver>, capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    fn cached(&self, token: &str) -> Option<String> {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let (user_id, fetched_at) = cache.get(token)?;
        if fetched_at.elapsed() < self.ttl {
            return Some(user_id.clone());
        }
        cache.pop(token);
        None
    }

    fn remember(&self, token: &str, user_id: &str) {
        let mut cache = self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        cache.put(token.to_string(), (user_id.to_string(), Instant::now()));
    }
}

#[async_trait]
impl IdentityResolver for CachedIdentityResolver {
    async fn resolve(&self, token: &str) -> std::result::Result<Option<String>, StoreError> {
        if let Some(user_id) = self.cached(token) {
            return Ok(Some(user_id));
        }
        let resolved = self.inner.resolve(token).await?;
        if let Some(user_id) = &resolved {
            self.remember(token, user_id);
        }
        Ok(resolved)
    }
}

/// The user behind a bearer token
pub async fn authenticate_user(state: &AppState, token: Option<&str>) -> Result<String> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ServiceError::Unauthorized("missing API token".to_string()))?;
    state
        .identity
        .resolve(token)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("invalid API token".to_string()))
}
