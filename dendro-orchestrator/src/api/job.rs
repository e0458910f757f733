//! Job API Handlers
//!
//! HTTP endpoints for job submission, lookup and lifecycle.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use dendro_core::domain::job::{Job, JobSecret};
use dendro_core::dto::Ack;
use dendro_core::dto::job::{
    CreateJobRequest, DeleteJobsRequest, DeleteJobsResponse, FindJobByDefinitionRequest,
    FindJobByDefinitionResponse, GetJobParams, GetJobSecretRequest, JobQuery, JobQueryResponse,
    SetJobStatusRequest, SetOutputFileResultRequest,
};
use dendro_core::secrets::{self, Disclosure};

use crate::api::auth::BearerToken;
use crate::api::error::ApiResult;
use crate::service::job_service;
use crate::state::AppState;

// =============================================================================
// Submission & Lookup
// =============================================================================

/// POST /api/jobs
/// Submit a job, reusing an equivalent existing one when possible
pub async fn create_job(
    State(state): State<AppState>,
    token: BearerToken,
    Json(req): Json<CreateJobRequest>,
) -> ApiResult<Json<Job>> {
    tracing::info!("Creating job in service: {}", req.service_name);

    let req = req.validate()?;
    let job = job_service::create_job(&state, token.as_deref(), req).await?;
    secrets::seal(&job, Disclosure::Public)?;

    Ok(Json(job))
}

/// POST /api/jobs/find
/// Look up a job by its definition
pub async fn find_job_by_definition(
    State(state): State<AppState>,
    Json(req): Json<FindJobByDefinitionRequest>,
) -> ApiResult<Json<FindJobByDefinitionResponse>> {
    let req = req.validate()?;
    let job = job_service::find_job_by_definition(&state, req).await?;
    if let Some(job) = &job {
        secrets::seal(job, Disclosure::Public)?;
    }

    Ok(Json(FindJobByDefinitionResponse {
        found: job.is_some(),
        job,
    }))
}

/// POST /api/jobs/query
/// List jobs matching a filter
pub async fn query_jobs(
    State(state): State<AppState>,
    Json(query): Json<JobQuery>,
) -> ApiResult<Json<JobQueryResponse>> {
    tracing::debug!("Querying jobs: {:?}", query);

    let query = query.validate()?;
    let jobs = job_service::query_jobs(&state, query).await?;
    for job in &jobs {
        secrets::seal(job, Disclosure::Public)?;
    }

    Ok(Json(JobQueryResponse { jobs }))
}

/// GET /api/jobs/{id}
/// Get job details; the private key only goes to the bound compute client
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<GetJobParams>,
    token: BearerToken,
) -> ApiResult<Json<Job>> {
    tracing::debug!("Getting job: {}", id);

    let (job, disclosure) = job_service::get_job(&state, &id, &params, token.as_deref()).await?;
    secrets::seal(&job, disclosure)?;

    Ok(Json(job))
}

/// GET /api/jobs/{id}/runnable
/// Fetch a pending, runnable job to process it manually
pub async fn get_runnable_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: BearerToken,
) -> ApiResult<Json<Job>> {
    let job = job_service::get_runnable_job(&state, &id, token.as_deref()).await?;
    secrets::seal(&job, Disclosure::PrivateKey)?;

    Ok(Json(job))
}

// =============================================================================
// Lifecycle (job private key)
// =============================================================================

/// POST /api/jobs/{id}/status
/// Report a status change
pub async fn set_job_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: BearerToken,
    Json(req): Json<SetJobStatusRequest>,
) -> ApiResult<Json<Ack>> {
    tracing::info!("Setting status of job {} to {}", id, req.status);

    job_service::set_job_status(&state, &id, token.as_deref(), req).await?;
    Ok(Json(Ack::ok()))
}

/// POST /api/jobs/{id}/outputs
/// Record the uploaded result of one output file
pub async fn set_output_file_result(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: BearerToken,
    Json(req): Json<SetOutputFileResultRequest>,
) -> ApiResult<Json<Ack>> {
    tracing::debug!("Output {} reported for job {}", req.name, id);

    job_service::set_output_file_result(&state, &id, token.as_deref(), req).await?;
    Ok(Json(Ack::ok()))
}

/// POST /api/jobs/{id}/secret
pub async fn get_job_secret(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: BearerToken,
    Json(req): Json<GetJobSecretRequest>,
) -> ApiResult<Json<JobSecret>> {
    let secret = job_service::get_job_secret(&state, &id, token.as_deref(), req).await?;
    Ok(Json(secret))
}

// =============================================================================
// Cancellation & Deletion (user API token)
// =============================================================================

/// POST /api/jobs/{id}/cancel
pub async fn cancel_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    token: BearerToken,
) -> ApiResult<Json<Ack>> {
    tracing::info!("Canceling job: {}", id);

    job_service::cancel_job(&state, &id, token.as_deref()).await?;
    Ok(Json(Ack::ok()))
}

/// POST /api/jobs/delete
/// Delete pending jobs and archive the rest
pub async fn delete_jobs(
    State(state): State<AppState>,
    token: BearerToken,
    Json(req): Json<DeleteJobsRequest>,
) -> ApiResult<Json<DeleteJobsResponse>> {
    tracing::info!("Deleting {} jobs", req.job_ids.len());

    let req = req.validate()?;
    let response = job_service::delete_jobs(&state, token.as_deref(), req).await?;
    Ok(Json(response))
}
