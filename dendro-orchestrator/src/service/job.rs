//! Job Service
//!
//! Business logic for job submission, lookup and lifecycle.

use std::collections::BTreeSet;

use dendro_core::canonical;
use dendro_core::clock::now_sec;
use dendro_core::domain::job::{self as job_domain, Job, JobSecret, JobStatus, OutputFileResult};
use dendro_core::domain::service::Service;
use dendro_core::dto::job::{
    CreateJobRequest, DeleteJobsRequest, DeleteJobsResponse, FindJobByDefinitionRequest,
    GetJobParams, GetJobSecretRequest, JobQuery, SetJobStatusRequest, SetOutputFileResultRequest,
    ValidatedCreateJob,
};
use dendro_core::event::JobEvent;
use dendro_core::ids;
use dendro_core::patch::{JobPatch, Patch};
use dendro_core::secrets::{self, Disclosure};
use dendro_core::transition::{self, ComputeClientBinding, TransitionRequest};

use super::error::{Result, ServiceError};
use super::{compute_client as compute_client_service, dependency, identity, notifier};
use crate::state::AppState;

pub(crate) async fn load_job(state: &AppState, job_id: &str) -> Result<Job> {
    state
        .jobs
        .find_by_id(job_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Job {} not found", job_id)))
}

pub(crate) async fn load_service(state: &AppState, service_name: &str) -> Result<Service> {
    state
        .services
        .find_service(service_name)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Service {} not found", service_name)))
}

/// The caller must hold the job's private key
fn verify_job_key(job: &Job, token: Option<&str>) -> Result<()> {
    match (job.job_private_key.as_deref(), token) {
        (Some(expected), Some(given)) if expected == given => Ok(()),
        _ => Err(ServiceError::Unauthorized(format!(
            "invalid private key for job {}",
            job.job_id
        ))),
    }
}

// =============================================================================
// Submission
// =============================================================================

/// Submit a job, or hand back an equivalent one that already exists
///
/// Unless `skip_cache` is set, a job in the same service with the same
/// definition hash is reused: a non-failed one always, a failed one unless
/// `rerun_failing` asks for a fresh attempt.
pub async fn create_job(
    state: &AppState,
    token: Option<&str>,
    req: ValidatedCreateJob,
) -> Result<Job> {
    let user_id = identity::authenticate_user(state, token).await?;
    if let Some(claimed) = &req.user_id {
        if *claimed != user_id {
            return Err(ServiceError::Unauthorized(format!(
                "userId {} does not match the API token",
                claimed
            )));
        }
    }

    let service = load_service(state, &req.service_name).await?;
    if !service.user_is_allowed_to_create_jobs(&user_id) {
        return Err(ServiceError::Unauthorized(format!(
            "user {} cannot create jobs in service {}",
            user_id, service.service_name
        )));
    }

    let hash = canonical::job_definition_hash(&req.job_definition)?;

    if !req.skip_cache {
        if let Some(existing) = reuse_existing(state, &req, &hash).await? {
            tracing::info!(
                job_id = %existing.job_id,
                "Reusing existing job for identical definition"
            );
            return Ok(secrets::redact(existing, Disclosure::Public));
        }
    }

    let req = req.into_inner();
    let is_runnable = dependency::is_runnable(state, &req.job_dependencies).await?;
    let job = build_job(state, req, user_id, hash, is_runnable);

    state.jobs.insert(&job).await?;

    tracing::info!(
        job_id = %job.job_id,
        service = %job.service_name,
        is_runnable = job.is_runnable,
        "Job created"
    );
    notifier::publish(
        state.notifier.as_ref(),
        JobEvent::NewPendingJob {
            service_name: job.service_name.clone(),
            job_id: job.job_id.clone(),
        },
    );

    Ok(secrets::redact(job, Disclosure::Public))
}

fn build_job(
    state: &AppState,
    req: CreateJobRequest,
    user_id: String,
    hash: String,
    is_runnable: bool,
) -> Job {
    let now = now_sec();
    let input_file_url_list = req
        .job_definition
        .input_files
        .iter()
        .map(|f| f.url.clone())
        .collect();

    let mut job = Job {
        job_id: ids::generate_job_id(),
        job_private_key: Some(ids::generate_job_private_key()),
        service_name: req.service_name,
        user_id,
        batch_id: req.batch_id,
        tags: dedup_tags(req.tags),
        job_definition: req.job_definition,
        job_definition_hash: hash,
        job_dependencies: req.job_dependencies,
        required_resources: req.required_resources,
        target_compute_client_ids: req.target_compute_client_ids,
        secrets: req.secrets,
        input_file_url_list,
        output_file_url_list: Vec::new(),
        output_file_results: Vec::new(),
        console_output_url: String::new(),
        resource_utilization_log_url: String::new(),
        timestamp_created_sec: now,
        timestamp_updated_sec: now,
        timestamp_starting_sec: None,
        timestamp_started_sec: None,
        timestamp_finished_sec: None,
        canceled: false,
        status: JobStatus::Pending,
        is_runnable,
        error: None,
        compute_client_id: None,
        compute_client_name: None,
        compute_client_user_id: None,
        image_uri: None,
    };

    let base = &state.config.output_base_url;
    job.console_output_url = job_domain::console_output_url(base, &job);
    job.resource_utilization_log_url = job_domain::resource_utilization_log_url(base, &job);
    job
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(tags.len());
    for tag in tags {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

async fn reuse_existing(
    state: &AppState,
    req: &CreateJobRequest,
    hash: &str,
) -> Result<Option<Job>> {
    let candidates = state.jobs.find_by_definition_hash(&req.service_name, hash).await?;

    if let Some(existing) = candidates.iter().find(|j| j.status != JobStatus::Failed) {
        return merge_tags(state, existing.clone(), &req.tags).await.map(Some);
    }

    let Some(failed) = candidates.into_iter().next() else {
        return Ok(None);
    };
    if !req.rerun_failing {
        return merge_tags(state, failed, &req.tags).await.map(Some);
    }
    if req.delete_failing {
        tracing::info!(job_id = %failed.job_id, "Deleting failed job before rerun");
        remove_job(state, &failed).await?;
    }
    Ok(None)
}

/// Add tags the existing job does not carry yet, keeping its order
async fn merge_tags(state: &AppState, mut job: Job, tags: &[String]) -> Result<Job> {
    let mut changed = false;
    for tag in tags {
        if !job.tags.contains(tag) {
            job.tags.push(tag.clone());
            changed = true;
        }
    }
    if changed {
        let patch = JobPatch {
            tags: Patch::Set(job.tags.clone()),
            ..JobPatch::touched(now_sec())
        };
        state.jobs.update(&job.job_id, &patch).await?;
    }
    Ok(job)
}

// =============================================================================
// Lookup
// =============================================================================

/// Most relevant job with the same definition: any non-failed one, else the
/// newest failed one
pub async fn find_job_by_definition(
    state: &AppState,
    req: FindJobByDefinitionRequest,
) -> Result<Option<Job>> {
    let hash = canonical::job_definition_hash(&req.job_definition)?;
    let candidates = state.jobs.find_by_definition_hash(&req.service_name, &hash).await?;

    let chosen = match candidates.iter().position(|j| j.status != JobStatus::Failed) {
        Some(index) => candidates.into_iter().nth(index),
        None => candidates.into_iter().next(),
    };
    Ok(chosen.map(|job| secrets::redact(job, Disclosure::Public)))
}

/// Fetch a job; the private key is included only for the bound compute
/// client presenting its own private key
pub async fn get_job(
    state: &AppState,
    job_id: &str,
    params: &GetJobParams,
    token: Option<&str>,
) -> Result<(Job, Disclosure)> {
    let job = load_job(state, job_id).await?;
    if !params.include_private_key {
        return Ok((secrets::redact(job, Disclosure::Public), Disclosure::Public));
    }

    let compute_client_id = params.compute_client_id.as_deref().ok_or_else(|| {
        ServiceError::InvalidRequest(
            "computeClientId is required with includePrivateKey".to_string(),
        )
    })?;
    if job.compute_client_id.as_deref() != Some(compute_client_id) {
        return Err(ServiceError::Unauthorized(format!(
            "job {} is not bound to compute client {}",
            job_id, compute_client_id
        )));
    }
    compute_client_service::authenticate_compute_client(state, compute_client_id, token).await?;

    Ok((secrets::redact(job, Disclosure::PrivateKey), Disclosure::PrivateKey))
}

pub async fn query_jobs(state: &AppState, query: JobQuery) -> Result<Vec<Job>> {
    let jobs = state.jobs.find(&query).await?;
    Ok(jobs
        .into_iter()
        .map(|job| secrets::redact(job, Disclosure::Public))
        .collect())
}

/// Hand an untargeted, pending, runnable job to a user who may process
/// jobs for its service, so they can run it on their own hardware
pub async fn get_runnable_job(state: &AppState, job_id: &str, token: Option<&str>) -> Result<Job> {
    let user_id = identity::authenticate_user(state, token).await?;
    let job = load_job(state, job_id).await?;

    let service = load_service(state, &job.service_name).await?;
    if !service.user_is_allowed_to_process_jobs(&user_id) {
        return Err(ServiceError::Unauthorized(format!(
            "user {} cannot process jobs in service {}",
            user_id, service.service_name
        )));
    }

    if job.status != JobStatus::Pending {
        return Err(ServiceError::InvalidState(format!("job {} is {}", job_id, job.status)));
    }
    if !job.is_runnable {
        return Err(ServiceError::InvalidState(format!(
            "job {} is waiting on its dependencies",
            job_id
        )));
    }
    if !job.is_untargeted() {
        return Err(ServiceError::InvalidState(format!(
            "job {} is targeted at specific compute clients",
            job_id
        )));
    }

    Ok(secrets::redact(job, Disclosure::PrivateKey))
}

// =============================================================================
// Lifecycle
// =============================================================================

/// Report a status change, authorized by the job private key
pub async fn set_job_status(
    state: &AppState,
    job_id: &str,
    token: Option<&str>,
    req: SetJobStatusRequest,
) -> Result<()> {
    let job = load_job(state, job_id).await?;
    verify_job_key(&job, token)?;
    apply_status_change(state, &job, req).await
}

/// Apply a status change planned against `snapshot`
///
/// The write only lands if the stored job still has the snapshot's status;
/// otherwise another request got there first and the caller receives
/// [`ServiceError::ConcurrentModification`].
pub async fn apply_status_change(
    state: &AppState,
    snapshot: &Job,
    req: SetJobStatusRequest,
) -> Result<()> {
    let binding = match &req.compute_client_id {
        Some(id) => {
            let client = compute_client_service::load_compute_client(state, id).await?;
            Some(ComputeClientBinding {
                compute_client_id: client.compute_client_id,
                compute_client_name: client.compute_client_name,
                user_id: client.user_id,
            })
        }
        None => None,
    };

    if req.status == JobStatus::Starting {
        if let Some(binding) = &binding {
            let service = load_service(state, &snapshot.service_name).await?;
            if !service.user_is_allowed_to_process_jobs(&binding.user_id) {
                return Err(ServiceError::Unauthorized(format!(
                    "compute client {} is not allowed to process jobs in service {}",
                    binding.compute_client_id, service.service_name
                )));
            }
        }
    }

    let request = TransitionRequest {
        status: req.status,
        compute_client: binding,
        error: req.error,
        image_uri: req.image_uri,
    };
    let planned = transition::plan(snapshot, &request, now_sec())?;

    let applied = state
        .jobs
        .update_if_status(&snapshot.job_id, planned.from, &planned.patch)
        .await?;
    if !applied {
        tracing::debug!(
            job_id = %snapshot.job_id,
            "Lost status race moving {} -> {}",
            planned.from,
            planned.to
        );
        return Err(ServiceError::ConcurrentModification(format!(
            "job {} is no longer {}",
            snapshot.job_id, planned.from
        )));
    }

    tracing::info!(
        job_id = %snapshot.job_id,
        from = %planned.from,
        to = %planned.to,
        "Job status changed"
    );

    if planned.to == JobStatus::Completed {
        if let Err(e) = dependency::release_dependents(state, &snapshot.job_id).await {
            tracing::error!(
                job_id = %snapshot.job_id,
                error = %e,
                "Failed to release dependent jobs"
            );
        }
    }

    notifier::publish(
        state.notifier.as_ref(),
        JobEvent::JobStatusChanged {
            service_name: snapshot.service_name.clone(),
            job_id: snapshot.job_id.clone(),
            status: planned.to,
        },
    );

    Ok(())
}

/// Record one output of a running job
pub async fn set_output_file_result(
    state: &AppState,
    job_id: &str,
    token: Option<&str>,
    req: SetOutputFileResultRequest,
) -> Result<()> {
    let job = load_job(state, job_id).await?;
    verify_job_key(&job, token)?;

    if job.status != JobStatus::Running {
        return Err(ServiceError::InvalidState(format!(
            "outputs can only be recorded while job {} is running",
            job_id
        )));
    }

    let output = job
        .job_definition
        .output_file(&req.name)
        .ok_or_else(|| {
            ServiceError::InvalidRequest(format!(
                "job {} has no output named {}",
                job_id, req.name
            ))
        })?;

    let url = if output.is_runtime_url() {
        req.url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                ServiceError::InvalidRequest(format!("output {} needs a url", output.name))
            })?
    } else {
        let expected = job_domain::output_file_url(
            &state.config.output_base_url,
            &job,
            &output.name,
            &output.file_base_name,
        );
        if req.url.as_deref().is_some_and(|given| given != expected) {
            return Err(ServiceError::InvalidRequest(format!(
                "output {} must be stored at {}",
                output.name, expected
            )));
        }
        expected
    };

    let result = OutputFileResult {
        name: output.name.clone(),
        file_base_name: output.file_base_name.clone(),
        url,
        size: req.size,
    };
    let mut results = job.output_file_results.clone();
    match results.iter_mut().find(|r| r.name == result.name) {
        Some(existing) => *existing = result,
        None => results.push(result),
    }

    let patch = JobPatch {
        output_file_results: Patch::Set(results),
        ..JobPatch::touched(now_sec())
    };
    if !state.jobs.update_if_status(job_id, JobStatus::Running, &patch).await? {
        return Err(ServiceError::ConcurrentModification(format!(
            "job {} stopped running",
            job_id
        )));
    }
    Ok(())
}

/// Release one secret to the compute client executing the job
pub async fn get_job_secret(
    state: &AppState,
    job_id: &str,
    token: Option<&str>,
    req: GetJobSecretRequest,
) -> Result<JobSecret> {
    let job = load_job(state, job_id).await?;
    verify_job_key(&job, token)?;

    if job.compute_client_id.as_deref() != Some(req.compute_client_id.as_str()) {
        return Err(ServiceError::Unauthorized(format!(
            "job {} is not bound to compute client {}",
            job_id, req.compute_client_id
        )));
    }
    if !job.status.is_active() {
        return Err(ServiceError::InvalidState(format!(
            "secrets are only available while job {} is starting or running",
            job_id
        )));
    }

    let client = compute_client_service::load_compute_client(state, &req.compute_client_id).await?;
    if !state.config.is_secret_holder(&client.user_id) {
        return Err(ServiceError::Unauthorized(format!(
            "compute client {} may not receive secrets",
            client.compute_client_id
        )));
    }

    let secret = job
        .secret(&req.name)
        .cloned()
        .ok_or_else(|| {
            ServiceError::NotFound(format!("job {} has no secret {}", job_id, req.name))
        })?;
    tracing::info!(job_id = %job_id, secret = %secret.name, "Released job secret");
    Ok(secret)
}

/// Flag a job as canceled; the executing compute client stops it
pub async fn cancel_job(state: &AppState, job_id: &str, token: Option<&str>) -> Result<()> {
    let user_id = identity::authenticate_user(state, token).await?;
    let job = load_job(state, job_id).await?;

    if job.user_id != user_id {
        let service = load_service(state, &job.service_name).await?;
        if !service.user_is_admin(&user_id) {
            return Err(ServiceError::Unauthorized(format!(
                "user {} cannot cancel job {}",
                user_id, job_id
            )));
        }
    }
    if job.status.is_terminal() {
        return Err(ServiceError::InvalidState(format!(
            "job {} is already {}",
            job_id, job.status
        )));
    }
    if job.canceled {
        return Ok(());
    }

    let patch = JobPatch {
        canceled: Patch::Set(true),
        ..JobPatch::touched(now_sec())
    };
    if !state.jobs.update_if_status(job_id, job.status, &patch).await? {
        return Err(ServiceError::ConcurrentModification(format!(
            "job {} changed while canceling",
            job_id
        )));
    }

    tracing::info!(job_id = %job_id, "Job canceled");
    Ok(())
}

// =============================================================================
// Deletion
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Deleted,
    Archived,
    Missing,
}

/// Pending jobs never ran and are dropped; everything else is archived
///
/// The delete only applies while the stored row is still pending. A job
/// claimed after `job` was read falls through to the archive.
async fn remove_job(state: &AppState, job: &Job) -> Result<Removal> {
    if job.status == JobStatus::Pending
        && state
            .jobs
            .delete_if_status(&job.job_id, JobStatus::Pending)
            .await?
    {
        return Ok(Removal::Deleted);
    }
    let archived = state.jobs.archive(&job.job_id).await?;
    Ok(if archived { Removal::Archived } else { Removal::Missing })
}

/// Delete jobs across one or more services
///
/// The caller needs delete rights in every service touched; nothing is
/// removed if any check fails.
pub async fn delete_jobs(
    state: &AppState,
    token: Option<&str>,
    req: DeleteJobsRequest,
) -> Result<DeleteJobsResponse> {
    let user_id = identity::authenticate_user(state, token).await?;
    if let Some(claimed) = &req.user_id {
        if *claimed != user_id {
            return Err(ServiceError::Unauthorized(format!(
                "userId {} does not match the API token",
                claimed
            )));
        }
    }

    let requested: BTreeSet<String> = req.job_ids.into_iter().collect();
    let ids: Vec<String> = requested.iter().cloned().collect();
    let jobs = state.jobs.find_by_ids(&ids).await?;
    if jobs.len() != requested.len() {
        let missing: Vec<&str> = requested
            .iter()
            .filter(|id| !jobs.iter().any(|j| &j.job_id == *id))
            .map(String::as_str)
            .collect();
        return Err(ServiceError::NotFound(format!("Jobs not found: {}", missing.join(", "))));
    }

    let service_names: BTreeSet<&str> = jobs.iter().map(|j| j.service_name.as_str()).collect();
    for service_name in service_names {
        let service = load_service(state, service_name).await?;
        if !service.user_is_allowed_to_delete_jobs(&user_id) {
            return Err(ServiceError::Unauthorized(format!(
                "user {} cannot delete jobs in service {}",
                user_id, service_name
            )));
        }
    }

    let mut response = DeleteJobsResponse {
        deleted_count: 0,
        archived_count: 0,
    };
    for job in &jobs {
        match remove_job(state, job).await? {
            Removal::Deleted => response.deleted_count += 1,
            Removal::Archived => response.archived_count += 1,
            Removal::Missing => {}
        }
    }

    tracing::info!(
        deleted = response.deleted_count,
        archived = response.archived_count,
        "Jobs deleted by {}",
        user_id
    );
    Ok(response)
}
