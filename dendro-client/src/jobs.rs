//! Job-related API endpoints

use dendro_core::domain::job::{Job, JobSecret};
use dendro_core::dto::job::{
    CreateJobRequest, DeleteJobsRequest, DeleteJobsResponse, FindJobByDefinitionRequest,
    FindJobByDefinitionResponse, GetJobSecretRequest, JobQuery, JobQueryResponse,
    SetJobStatusRequest, SetOutputFileResultRequest,
};

use crate::OrchestratorClient;
use crate::error::Result;

impl OrchestratorClient {
    // =============================================================================
    // Submission & Lookup
    // =============================================================================

    /// Submit a job with a user API token
    pub async fn create_job(&self, api_key: &str, req: &CreateJobRequest) -> Result<Job> {
        let request = self.client.post(self.url("/api/jobs")).json(req);
        let response = Self::authed(request, api_key).send().await?;

        self.handle_response(response).await
    }

    pub async fn find_job_by_definition(
        &self,
        req: &FindJobByDefinitionRequest,
    ) -> Result<Option<Job>> {
        let response = self.client.post(self.url("/api/jobs/find")).json(req).send().await?;

        let found: FindJobByDefinitionResponse = self.handle_response(response).await?;
        Ok(found.job)
    }

    pub async fn query_jobs(&self, query: &JobQuery) -> Result<Vec<Job>> {
        let response = self.client.post(self.url("/api/jobs/query")).json(query).send().await?;

        let listed: JobQueryResponse = self.handle_response(response).await?;
        Ok(listed.jobs)
    }

    /// Public view of a job
    pub async fn get_job(&self, job_id: &str) -> Result<Job> {
        let response = self
            .client
            .get(self.url(&format!("/api/jobs/{}", job_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    /// A job bound to this compute client, private key included
    pub async fn get_job_with_private_key(
        &self,
        job_id: &str,
        compute_client_id: &str,
        compute_client_private_key: &str,
    ) -> Result<Job> {
        let request = self
            .client
            .get(self.url(&format!("/api/jobs/{}", job_id)))
            .query(&[("includePrivateKey", "true"), ("computeClientId", compute_client_id)]);
        let response = Self::authed(request, compute_client_private_key).send().await?;

        self.handle_response(response).await
    }

    /// A pending job to process manually
    pub async fn get_runnable_job(&self, api_key: &str, job_id: &str) -> Result<Job> {
        let request = self.client.get(self.url(&format!("/api/jobs/{}/runnable", job_id)));
        let response = Self::authed(request, api_key).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Lifecycle (job private key)
    // =============================================================================

    pub async fn set_job_status(
        &self,
        job_id: &str,
        job_private_key: &str,
        req: &SetJobStatusRequest,
    ) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/api/jobs/{}/status", job_id)))
            .json(req);
        let response = Self::authed(request, job_private_key).send().await?;

        self.handle_ack(response).await
    }

    pub async fn set_output_file_result(
        &self,
        job_id: &str,
        job_private_key: &str,
        req: &SetOutputFileResultRequest,
    ) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/api/jobs/{}/outputs", job_id)))
            .json(req);
        let response = Self::authed(request, job_private_key).send().await?;

        self.handle_ack(response).await
    }

    pub async fn get_job_secret(
        &self,
        job_id: &str,
        job_private_key: &str,
        req: &GetJobSecretRequest,
    ) -> Result<JobSecret> {
        let request = self
            .client
            .post(self.url(&format!("/api/jobs/{}/secret", job_id)))
            .json(req);
        let response = Self::authed(request, job_private_key).send().await?;

        self.handle_response(response).await
    }

    // =============================================================================
    // Cancellation & Deletion (user API token)
    // =============================================================================

    pub async fn cancel_job(&self, api_key: &str, job_id: &str) -> Result<()> {
        let request = self.client.post(self.url(&format!("/api/jobs/{}/cancel", job_id)));
        let response = Self::authed(request, api_key).send().await?;

        self.handle_ack(response).await
    }

    pub async fn delete_jobs(
        &self,
        api_key: &str,
        req: &DeleteJobsRequest,
    ) -> Result<DeleteJobsResponse> {
        let request = self.client.post(self.url("/api/jobs/delete")).json(req);
        let response = Self::authed(request, api_key).send().await?;

        self.handle_response(response).await
    }
}
