//! Compute client and service API endpoints

use dendro_core::domain::compute_client::ComputeClient;
use dendro_core::dto::compute_client::{
    GetRunnableJobsRequest, GetRunnableJobsResponse, RegisterComputeClientRequest,
    RegisterComputeClientResponse, SetComputeClientInfoRequest,
};

use crate::OrchestratorClient;
use crate::error::Result;

impl OrchestratorClient {
    /// Register a compute client owned by the API key's user
    ///
    /// The returned private key is shown only once.
    pub async fn register_compute_client(
        &self,
        api_key: &str,
        req: &RegisterComputeClientRequest,
    ) -> Result<RegisterComputeClientResponse> {
        let request = self.client.post(self.url("/api/compute-clients")).json(req);
        let response = Self::authed(request, api_key).send().await?;

        self.handle_response(response).await
    }

    pub async fn get_compute_client(&self, compute_client_id: &str) -> Result<ComputeClient> {
        let response = self
            .client
            .get(self.url(&format!("/api/compute-clients/{}", compute_client_id)))
            .send()
            .await?;

        self.handle_response(response).await
    }

    pub async fn set_compute_client_info(
        &self,
        api_key: &str,
        compute_client_id: &str,
        req: &SetComputeClientInfoRequest,
    ) -> Result<()> {
        let request = self
            .client
            .put(self.url(&format!("/api/compute-clients/{}", compute_client_id)))
            .json(req);
        let response = Self::authed(request, api_key).send().await?;

        self.handle_ack(response).await
    }

    pub async fn delete_compute_client(
        &self,
        api_key: &str,
        compute_client_id: &str,
    ) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/api/compute-clients/{}", compute_client_id)));
        let response = Self::authed(request, api_key).send().await?;

        self.handle_ack(response).await
    }

    /// Poll for work, authenticated by the compute client's private key
    pub async fn get_runnable_jobs(
        &self,
        compute_client_id: &str,
        compute_client_private_key: &str,
        req: &GetRunnableJobsRequest,
    ) -> Result<GetRunnableJobsResponse> {
        let request = self
            .client
            .post(self.url(&format!("/api/compute-clients/{}/runnable-jobs", compute_client_id)))
            .json(req);
        let response = Self::authed(request, compute_client_private_key).send().await?;

        self.handle_response(response).await
    }

    /// Ask every compute client of a service to poll now (service admins only)
    pub async fn ping_compute_clients(&self, api_key: &str, service_name: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/api/services/{}/ping", service_name)));
        let response = Self::authed(request, api_key).send().await?;

        self.handle_ack(response).await
    }
}
