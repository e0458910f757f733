//! In-memory stores
//!
//! Used by tests and by `DENDRO_STORE=memory` for local development. Each
//! store keeps its records behind a single lock, so a conditional update
//! checks and writes without interleaving, like the Postgres `UPDATE ...
//! WHERE status = $n`.

use std::collections::HashMap;

use async_trait::async_trait;
use dendro_core::admission;
use dendro_core::dependency;
use dendro_core::domain::compute_client::ComputeClient;
use dendro_core::domain::job::{Job, JobStatus};
use dendro_core::domain::service::Service;
use dendro_core::dto::job::JobQuery;
use dendro_core::patch::{ComputeClientPatch, JobPatch};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use super::{
    ComputeClientStore, IdentityResolver, JobStore, RunnableQuery, ServiceDirectory, StoreError,
};

#[derive(Default)]
struct JobTables {
    live: HashMap<String, Job>,
    archived: HashMap<String, Job>,
}

pub struct MemoryJobStore {
    tables: Mutex<JobTables>,
    rng: Mutex<StdRng>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic sampling for tests
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            tables: Mutex::new(JobTables::default()),
            rng: Mutex::new(rng),
        }
    }

    pub async fn archived(&self, job_id: &str) -> Option<Job> {
        self.tables.lock().await.archived.get(job_id).cloned()
    }
}

impl Default for MemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

fn newest_first(mut jobs: Vec<Job>) -> Vec<Job> {
    admission::order_newest_first(&mut jobs);
    jobs
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn insert(&self, job: &Job) -> Result<(), StoreError> {
        self.tables.lock().await.live.insert(job.job_id.clone(), job.clone());
        Ok(())
    }

    async fn find_by_id(&self, job_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self.tables.lock().await.live.get(job_id).cloned())
    }

    async fn find_by_ids(&self, job_ids: &[String]) -> Result<Vec<Job>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(job_ids.iter().filter_map(|id| tables.live.get(id).cloned()).collect())
    }

    async fn find(&self, query: &JobQuery) -> Result<Vec<Job>, StoreError> {
        let matching = {
            let tables = self.tables.lock().await;
            tables.live.values().filter(|j| query.matches(j)).cloned().collect()
        };
        let mut jobs = newest_first(matching);
        if let Some(limit) = query.limit {
            jobs.truncate(limit);
        }
        Ok(jobs)
    }

    async fn find_by_definition_hash(
        &self,
        service_name: &str,
        hash: &str,
    ) -> Result<Vec<Job>, StoreError> {
        let matching = {
            let tables = self.tables.lock().await;
            tables
                .live
                .values()
                .filter(|j| j.service_name == service_name && j.job_definition_hash == hash)
                .cloned()
                .collect()
        };
        Ok(newest_first(matching))
    }

    async fn find_active_for_compute_client(
        &self,
        compute_client_id: &str,
    ) -> Result<Vec<Job>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .live
            .values()
            .filter(|j| {
                j.status.is_active() && j.compute_client_id.as_deref() == Some(compute_client_id)
            })
            .cloned()
            .collect())
    }

    async fn sample_runnable(
        &self,
        query: &RunnableQuery,
        sample_size: usize,
    ) -> Result<Vec<Job>, StoreError> {
        let mut matching: Vec<Job> = {
            let tables = self.tables.lock().await;
            tables.live.values().filter(|j| query.matches(j)).cloned().collect()
        };
        // HashMap iteration order is not reproducible; fix it before sampling
        matching.sort_by(|a, b| a.job_id.cmp(&b.job_id));
        let mut rng = self.rng.lock().await;
        Ok(admission::random_sample(matching, sample_size, &mut *rng))
    }

    async fn find_blocked_dependents(&self, job_id: &str) -> Result<Vec<Job>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .live
            .values()
            .filter(|j| dependency::is_blocked_on(j, job_id))
            .cloned()
            .collect())
    }

    async fn update(&self, job_id: &str, patch: &JobPatch) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.live.get_mut(job_id) {
            Some(job) => {
                patch.apply(job);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_if_status(
        &self,
        job_id: &str,
        expected: JobStatus,
        patch: &JobPatch,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.live.get_mut(job_id) {
            Some(job) if job.status == expected => {
                patch.apply(job);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_runnable(&self, job_id: &str, patch: &JobPatch) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.live.get_mut(job_id) {
            Some(job) if job.status == JobStatus::Pending && !job.is_runnable => {
                patch.apply(job);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn archive(&self, job_id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        match tables.live.remove(job_id) {
            Some(job) => {
                tables.archived.insert(job_id.to_string(), job);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_if_status(
        &self,
        job_id: &str,
        expected: JobStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.live.get(job_id).is_some_and(|j| j.status == expected) {
            tables.live.remove(job_id);
            return Ok(true);
        }
        Ok(false)
    }
}

#[derive(Default)]
pub struct MemoryComputeClientStore {
    clients: RwLock<HashMap<String, ComputeClient>>,
}

impl MemoryComputeClientStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComputeClientStore for MemoryComputeClientStore {
    async fn insert(&self, client: &ComputeClient) -> Result<(), StoreError> {
        self.clients
            .write()
            .await
            .insert(client.compute_client_id.clone(), client.clone());
        Ok(())
    }

    async fn find_by_id(
        &self,
        compute_client_id: &str,
    ) -> Result<Option<ComputeClient>, StoreError> {
        Ok(self.clients.read().await.get(compute_client_id).cloned())
    }

    async fn update(
        &self,
        compute_client_id: &str,
        patch: &ComputeClientPatch,
    ) -> Result<bool, StoreError> {
        let mut clients = self.clients.write().await;
        match clients.get_mut(compute_client_id) {
            Some(client) => {
                patch.apply(client);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, compute_client_id: &str) -> Result<bool, StoreError> {
        Ok(self.clients.write().await.remove(compute_client_id).is_some())
    }
}

#[derive(Default)]
pub struct MemoryServiceDirectory {
    services: RwLock<HashMap<String, Service>>,
}

impl MemoryServiceDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, service: Service) {
        self.services.write().await.insert(service.service_name.clone(), service);
    }
}

#[async_trait]
impl ServiceDirectory for MemoryServiceDirectory {
    async fn find_service(&self, service_name: &str) -> Result<Option<Service>, StoreError> {
        Ok(self.services.read().await.get(service_name).cloned())
    }
}

#[derive(Default)]
pub struct MemoryIdentityResolver {
    tokens: RwLock<HashMap<String, String>>,
}

impl MemoryIdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, token: impl Into<String>, user_id: impl Into<String>) {
        self.tokens.write().await.insert(token.into(), user_id.into());
    }
}

#[async_trait]
impl IdentityResolver for MemoryIdentityResolver {
    async fn resolve(&self, token: &str) -> Result<Option<String>, StoreError> {
        Ok(self.tokens.read().await.get(token).cloned())
    }
}

/// Contents of `DENDRO_SEED_FILE`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedData {
    #[serde(default)]
    pub services: Vec<Service>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedUser {
    pub user_id: String,
    pub api_key: String,
}

impl SeedData {
    pub async fn load_into(
        self,
        services: &MemoryServiceDirectory,
        identities: &MemoryIdentityResolver,
    ) {
        for service in self.services {
            services.insert(service).await;
        }
        for user in self.users {
            identities.insert(user.api_key, user.user_id).await;
        }
    }
}
