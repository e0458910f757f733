//! Admission Service
//!
//! Answers a compute client's poll: which jobs is it running, and which
//! pending jobs should it take next.

use dendro_core::admission::{self, AdmissionOptions};
use dendro_core::clock::now_sec;
use dendro_core::dto::compute_client::{GetRunnableJobsRequest, GetRunnableJobsResponse};
use dendro_core::patch::{ComputeClientPatch, Patch};
use dendro_core::secrets::{self, Disclosure};

use super::compute_client as compute_client_service;
use super::error::Result;
use crate::repository::RunnableQuery;
use crate::state::AppState;

/// Running jobs plus the pending jobs that fit the client's free slots
///
/// Services are visited in the client's priority order. Within a service a
/// random sample of pending jobs is taken so concurrent pollers rarely
/// chase the same jobs, then the sample is ordered newest first. Nothing is
/// claimed here; the client claims each job with a status update.
pub async fn get_runnable_jobs_for_compute_client(
    state: &AppState,
    compute_client_id: &str,
    token: Option<&str>,
    req: GetRunnableJobsRequest,
) -> Result<GetRunnableJobsResponse> {
    let client = compute_client_service::authenticate_compute_client(
        state,
        compute_client_id,
        token,
    )
    .await?;

    let touch = ComputeClientPatch {
        timestamp_last_active_sec: Patch::Set(Some(now_sec())),
        ..Default::default()
    };
    state.compute_clients.update(compute_client_id, &touch).await?;

    let running_jobs = if req.job_id.is_some() && req.single_job {
        Vec::new()
    } else {
        state.jobs.find_active_for_compute_client(compute_client_id).await?
    };

    let mut candidates = Vec::new();
    for service_name in &client.service_names {
        let Some(service) = state.services.find_service(service_name).await? else {
            tracing::warn!(
                compute_client_id = %compute_client_id,
                "Skipping unknown service {}",
                service_name
            );
            continue;
        };
        if !service.user_is_allowed_to_process_jobs(&client.user_id) {
            tracing::debug!(
                compute_client_id = %compute_client_id,
                "Owner {} may not process jobs for service {}",
                client.user_id,
                service_name
            );
            continue;
        }

        let query = RunnableQuery {
            service_name: service_name.clone(),
            user_ids: client.process_jobs_for_users.clone(),
            job_id: req.job_id.clone(),
        };
        let mut sample = state
            .jobs
            .sample_runnable(&query, state.config.runnable_sample_size)
            .await?;
        admission::order_newest_first(&mut sample);
        candidates.extend(sample);
    }

    let options = AdmissionOptions {
        single_job: req.single_job,
        bypass_capacity: req.job_id.is_some(),
    };
    let admitted = admission::admit(&client, &running_jobs, candidates, options);

    tracing::debug!(
        compute_client_id = %compute_client_id,
        running = running_jobs.len(),
        admitted = admitted.len(),
        "Computed runnable jobs"
    );

    Ok(GetRunnableJobsResponse {
        runnable_jobs: admitted
            .into_iter()
            .map(|job| secrets::redact(job, Disclosure::PrivateKey))
            .collect(),
        running_jobs: running_jobs
            .into_iter()
            .map(|job| secrets::redact(job, Disclosure::PrivateKey))
            .collect(),
    })
}
