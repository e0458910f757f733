//! Jobs repository
//!
//! Everything the runner asks of the orchestrator, on behalf of one
//! compute client:
//! - Fetching runnable and running jobs
//! - Reporting status changes
//! - Checking for cancellation

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dendro_client::OrchestratorClient;
use dendro_core::domain::job::{Job, JobStatus};
use dendro_core::dto::compute_client::{GetRunnableJobsRequest, GetRunnableJobsResponse};
use dendro_core::dto::job::SetJobStatusRequest;

#[async_trait]
pub trait JobRepository: Send + Sync {
    /// Jobs this compute client may start now, plus the ones bound to it
    async fn fetch_runnable_jobs(&self) -> Result<GetRunnableJobsResponse>;

    /// Report a status change, authorized by the job's private key
    ///
    /// `error` is required for `failed` and rejected otherwise.
    async fn set_status(&self, job: &Job, status: JobStatus, error: Option<String>) -> Result<()>;

    /// Whether the job has been flagged as canceled
    async fn is_canceled(&self, job_id: &str) -> Result<bool>;
}

/// Repository backed by the orchestrator HTTP API
pub struct HttpJobRepository {
    client: Arc<OrchestratorClient>,
    compute_client_id: String,
    compute_client_private_key: String,
}

impl HttpJobRepository {
    pub fn new(
        client: Arc<OrchestratorClient>,
        compute_client_id: String,
        compute_client_private_key: String,
    ) -> Self {
        Self {
            client,
            compute_client_id,
            compute_client_private_key,
        }
    }
}

#[async_trait]
impl JobRepository for HttpJobRepository {
    async fn fetch_runnable_jobs(&self) -> Result<GetRunnableJobsResponse> {
        let response = self
            .client
            .get_runnable_jobs(
                &self.compute_client_id,
                &self.compute_client_private_key,
                &GetRunnableJobsRequest::default(),
            )
            .await?;
        Ok(response)
    }

    async fn set_status(&self, job: &Job, status: JobStatus, error: Option<String>) -> Result<()> {
        let job_private_key = job
            .job_private_key
            .as_deref()
            .with_context(|| format!("job {} arrived without its private key", job.job_id))?;

        let req = SetJobStatusRequest {
            status,
            compute_client_id: Some(self.compute_client_id.clone()),
            error,
            image_uri: None,
        };
        self.client
            .set_job_status(&job.job_id, job_private_key, &req)
            .await?;
        Ok(())
    }

    async fn is_canceled(&self, job_id: &str) -> Result<bool> {
        let job = self.client.get_job(job_id).await?;
        Ok(job.canceled)
    }
}
