//! Compute Client API Handlers
//!
//! Registration and configuration of compute clients, plus the poll
//! endpoint that hands them work.

use axum::{
    Json,
    extract::{Path, State},
};
use dendro_core::domain::compute_client::ComputeClient;
use dendro_core::dto::Ack;
use dendro_core::dto::compute_client::{
    GetRunnableJobsRequest, GetRunnableJobsResponse, RegisterComputeClientRequest,
    RegisterComputeClientResponse, SetComputeClientInfoRequest,
};
use dendro_core::secrets::{self, Disclosure};

use crate::api::auth::BearerToken;
use crate::api::error::ApiResult;
use crate::service::{admission_service, compute_client_service, pubsub_service};
use crate::state::AppState;

/// POST /api/compute-clients
/// Register a compute client owned by the caller
pub async fn register_compute_client(
    State(state): State<AppState>,
    token: BearerToken,
    Json(req): Json<RegisterComputeClientRequest>,
) -> ApiResult<Json<RegisterComputeClientResponse>> {
    tracing::info!("Registering compute client: {}", req.compute_client_name);

    let req = req.validate()?;
    let response = compute_client_service::register_compute_client(
        &state,
        token.as_deref(),
        req,
    )
    .await?;
    Ok(Json(response))
}

/// GET /api/compute-clients/{id}
pub async fn get_compute_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ComputeClient>> {
    tracing::debug!("Getting compute client: {}", id);

    let client = compute_client_service::get_compute_client(&state, &id).await?;
    Ok(Json(client))
}

/// PUT /api/compute-clients/{id}
pub async fn set_compute_client_info(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: BearerToken,
    Json(req): Json<SetComputeClientInfoRequest>,
) -> ApiResult<Json<Ack>> {
    compute_client_service::set_compute_client_info(&state, &id, token.as_deref(), req).await?;
    Ok(Json(Ack::ok()))
}

/// DELETE /api/compute-clients/{id}
pub async fn delete_compute_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: BearerToken,
) -> ApiResult<Json<Ack>> {
    tracing::info!("Deleting compute client: {}", id);

    compute_client_service::delete_compute_client(&state, &id, token.as_deref()).await?;
    Ok(Json(Ack::ok()))
}

/// POST /api/compute-clients/{id}/runnable-jobs
/// Running jobs plus the pending jobs this client may start now
pub async fn get_runnable_jobs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: BearerToken,
    Json(req): Json<GetRunnableJobsRequest>,
) -> ApiResult<Json<GetRunnableJobsResponse>> {
    tracing::debug!("Compute client {} polling for jobs", id);

    let response = admission_service::get_runnable_jobs_for_compute_client(
        &state,
        &id,
        token.as_deref(),
        req,
    )
    .await?;
    for job in response.runnable_jobs.iter().chain(&response.running_jobs) {
        secrets::seal(job, Disclosure::PrivateKey)?;
    }

    Ok(Json(response))
}

/// POST /api/services/{name}/ping
/// Wake up the compute clients serving a service
pub async fn ping_compute_clients(
    State(state): State<AppState>,
    Path(name): Path<String>,
    token: BearerToken,
) -> ApiResult<Json<Ack>> {
    tracing::info!("Pinging compute clients of service: {}", name);

    pubsub_service::ping_compute_clients(&state, &name, token.as_deref()).await?;
    Ok(Json(Ack::ok()))
}
