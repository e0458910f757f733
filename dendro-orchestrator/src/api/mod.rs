//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod auth;
pub mod compute_client;
pub mod error;
pub mod health;
pub mod job;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Job endpoints
        .route("/api/jobs", post(job::create_job))
        .route("/api/jobs/find", post(job::find_job_by_definition))
        .route("/api/jobs/query", post(job::query_jobs))
        .route("/api/jobs/delete", post(job::delete_jobs))
        .route("/api/jobs/{id}", get(job::get_job))
        .route("/api/jobs/{id}/runnable", get(job::get_runnable_job))
        .route("/api/jobs/{id}/status", post(job::set_job_status))
        .route("/api/jobs/{id}/outputs", post(job::set_output_file_result))
        .route("/api/jobs/{id}/secret", post(job::get_job_secret))
        .route("/api/jobs/{id}/cancel", post(job::cancel_job))
        // Compute client endpoints
        .route("/api/compute-clients", post(compute_client::register_compute_client))
        .route(
            "/api/compute-clients/{id}",
            get(compute_client::get_compute_client)
                .put(compute_client::set_compute_client_info)
                .delete(compute_client::delete_compute_client),
        )
        .route(
            "/api/compute-clients/{id}/runnable-jobs",
            post(compute_client::get_runnable_jobs),
        )
        // Service endpoints
        .route("/api/services/{name}/ping", post(compute_client::ping_compute_clients))
        // Add state and middleware
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
