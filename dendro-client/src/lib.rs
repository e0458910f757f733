//! Dendro HTTP Client
//!
//! Typed client for the orchestrator API, shared by the CLI and the
//! compute client daemon.
//!
//! Each call takes the credential it needs: a user API token, a compute
//! client private key or a job private key.
//!
//! # Example
//!
//! ```no_run
//! use dendro_client::OrchestratorClient;
//!
//! # async fn example() -> dendro_client::Result<()> {
//! let client = OrchestratorClient::new("http://localhost:8080");
//! let job = client.get_job("abc123").await?;
//! println!("{} is {}", job.job_id, job.status);
//! # Ok(())
//! # }
//! ```

pub mod error;
mod compute_clients;
mod jobs;

// Re-export commonly used types
pub use error::{ClientError, Result};

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;

/// HTTP client for the Dendro orchestrator API
#[derive(Debug, Clone)]
pub struct OrchestratorClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    /// HTTP client instance
    client: Client,
}

impl OrchestratorClient {
    /// Create a new orchestrator client
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    /// Create a new orchestrator client with a custom HTTP client
    ///
    /// This allows you to configure timeouts, proxies, TLS settings, etc.
    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authed(builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder.bearer_auth(token)
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status code and deserialize the JSON body
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            tracing::debug!(
                status = status.as_u16(),
                "Orchestrator returned an error: {}",
                error_text
            );
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        response
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Like [`Self::handle_response`] for endpoints that answer with a bare acknowledgement
    async fn handle_ack(&self, response: reqwest::Response) -> Result<()> {
        let _: dendro_core::dto::Ack = self.handle_response(response).await?;
        Ok(())
    }

    /// GET /health
    pub async fn health(&self) -> Result<()> {
        let response = self.client.get(self.url("/health")).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::api_error(status.as_u16(), "orchestrator is unhealthy"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = OrchestratorClient::new("http://localhost:8080");
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_client_trims_trailing_slash() {
        let client = OrchestratorClient::new("http://localhost:8080/");
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.url("/api/jobs"), "http://localhost:8080/api/jobs");
    }
}
