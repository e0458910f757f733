//! Job state machine
//!
//! ```text
//! pending ──▶ starting ──▶ running ──▶ completed
//!    │           │            │
//!    └───────────┴────────────┴──────▶ failed
//! ```
//!
//! [`plan`] validates a requested transition against a job snapshot and
//! produces the patch to apply. The caller persists that patch with a
//! conditional update on `(job_id, from)` so two racing transitions cannot
//! both win.

use crate::domain::job::{Job, JobStatus};
use crate::error::CoreError;
use crate::patch::{JobPatch, Patch};

/// Compute client reporting the transition
#[derive(Debug, Clone, PartialEq)]
pub struct ComputeClientBinding {
    pub compute_client_id: String,
    pub compute_client_name: String,
    pub user_id: String,
}

/// A requested status change
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRequest {
    pub status: JobStatus,
    pub compute_client: Option<ComputeClientBinding>,
    pub error: Option<String>,
    pub image_uri: Option<String>,
}

/// A validated transition, ready to persist
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedTransition {
    pub from: JobStatus,
    pub to: JobStatus,
    pub patch: JobPatch,
}

/// Validate `request` against `job` and build the resulting patch
pub fn plan(
    job: &Job,
    request: &TransitionRequest,
    now: f64,
) -> Result<PlannedTransition, CoreError> {
    let from = job.status;
    let to = request.status;

    let mut patch = JobPatch {
        status: Patch::Set(to),
        timestamp_updated_sec: Patch::Set(now),
        ..Default::default()
    };

    match (from, to) {
        (JobStatus::Pending, JobStatus::Starting) => {
            if !job.is_runnable {
                return Err(CoreError::InvalidState(format!(
                    "job {} is waiting on its dependencies",
                    job.job_id
                )));
            }
            if job.canceled {
                return Err(CoreError::InvalidState(format!(
                    "job {} has been canceled",
                    job.job_id
                )));
            }
            let client = request.compute_client.as_ref().ok_or_else(|| {
                CoreError::InvalidRequest("computeClientId is required to start a job".to_string())
            })?;
            if !job.is_targeted_at(&client.compute_client_id) {
                return Err(CoreError::Unauthorized(format!(
                    "job {} is not targeted at compute client {}",
                    job.job_id, client.compute_client_id
                )));
            }
            patch.compute_client_id = Patch::Set(Some(client.compute_client_id.clone()));
            patch.compute_client_name = Patch::Set(Some(client.compute_client_name.clone()));
            patch.compute_client_user_id = Patch::Set(Some(client.user_id.clone()));
            patch.timestamp_starting_sec = Patch::Set(Some(now));
            if request.image_uri.is_some() {
                patch.image_uri = Patch::Set(request.image_uri.clone());
            }
        }
        (JobStatus::Starting, JobStatus::Running) => {
            require_bound_client(job, request, true)?;
            patch.timestamp_started_sec = Patch::Set(Some(now));
            if request.image_uri.is_some() {
                patch.image_uri = Patch::Set(request.image_uri.clone());
            }
        }
        (JobStatus::Running, JobStatus::Completed) => {
            if request.error.as_deref().is_some_and(|e| !e.is_empty()) {
                return Err(CoreError::InvalidRequest(
                    "a completed job cannot carry an error".to_string(),
                ));
            }
            require_bound_client(job, request, true)?;
            patch.error = Patch::Set(None);
            patch.timestamp_finished_sec = Patch::Set(Some(now));
            let urls = job.output_file_results.iter().map(|r| r.url.clone()).collect();
            patch.output_file_url_list = Patch::Set(urls);
        }
        (JobStatus::Pending | JobStatus::Starting | JobStatus::Running, JobStatus::Failed) => {
            let error = request
                .error
                .as_deref()
                .filter(|e| !e.is_empty())
                .ok_or_else(|| {
                    CoreError::InvalidRequest("a failed job must carry an error".to_string())
                })?;
            require_bound_client(job, request, false)?;
            patch.error = Patch::Set(Some(error.to_string()));
            patch.timestamp_finished_sec = Patch::Set(Some(now));
        }
        _ => {
            return Err(CoreError::InvalidState(format!(
                "cannot move job {} from {} to {}",
                job.job_id, from, to
            )));
        }
    }

    Ok(PlannedTransition { from, to, patch })
}

/// The reporting client must be the one bound to the job. With
/// `required = false` a caller may omit the client entirely.
fn require_bound_client(
    job: &Job,
    request: &TransitionRequest,
    required: bool,
) -> Result<(), CoreError> {
    let Some(bound) = job.compute_client_id.as_deref() else {
        return Ok(());
    };
    match &request.compute_client {
        Some(client) if client.compute_client_id == bound => Ok(()),
        Some(client) => Err(CoreError::Unauthorized(format!(
            "job {} is bound to compute client {}, not {}",
            job.job_id, bound, client.compute_client_id
        ))),
        None if required => Err(CoreError::InvalidRequest(format!(
            "computeClientId is required to report status of job {}",
            job.job_id
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::job::OutputFileResult;
    use crate::testing::job;

    fn bound(status: JobStatus, client: &str) -> Job {
        let mut job = job(status);
        job.compute_client_id = Some(client.to_string());
        job
    }

    fn client(id: &str) -> ComputeClientBinding {
        ComputeClientBinding {
            compute_client_id: id.to_string(),
            compute_client_name: format!("{}-name", id),
            user_id: "worker".to_string(),
        }
    }

    fn request(
        status: JobStatus,
        client_id: Option<&str>,
        error: Option<&str>,
    ) -> TransitionRequest {
        TransitionRequest {
            status,
            compute_client: client_id.map(client),
            error: error.map(str::to_string),
            image_uri: None,
        }
    }

    #[test]
    fn test_claim_binds_compute_client() {
        let req = request(JobStatus::Starting, Some("cc"), None);
        let planned = plan(&job(JobStatus::Pending), &req, 5.0).unwrap();
        assert_eq!(planned.from, JobStatus::Pending);
        assert_eq!(planned.to, JobStatus::Starting);
        assert_eq!(planned.patch.compute_client_id, Patch::Set(Some("cc".to_string())));
        assert_eq!(planned.patch.compute_client_user_id, Patch::Set(Some("worker".to_string())));
        assert_eq!(planned.patch.timestamp_starting_sec, Patch::Set(Some(5.0)));
        assert_eq!(planned.patch.timestamp_updated_sec, Patch::Set(5.0));
    }

    #[test]
    fn test_claim_requires_runnable() {
        let mut blocked = job(JobStatus::Pending);
        blocked.is_runnable = false;
        let err = plan(&blocked, &request(JobStatus::Starting, Some("cc"), None), 5.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn test_claim_requires_compute_client() {
        let req = request(JobStatus::Starting, None, None);
        let err = plan(&job(JobStatus::Pending), &req, 5.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[test]
    fn test_claim_respects_targeting() {
        let mut targeted = job(JobStatus::Pending);
        targeted.target_compute_client_ids = Some(vec!["x".to_string()]);
        assert!(plan(&targeted, &request(JobStatus::Starting, Some("x"), None), 5.0).is_ok());
        let err = plan(&targeted, &request(JobStatus::Starting, Some("y"), None), 5.0).unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[test]
    fn test_skipping_starting_is_invalid_state() {
        let req = request(JobStatus::Running, Some("cc"), None);
        let err = plan(&job(JobStatus::Pending), &req, 5.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }

    #[test]
    fn test_running_requires_same_client() {
        let starting = bound(JobStatus::Starting, "cc");
        assert!(plan(&starting, &request(JobStatus::Running, Some("cc"), None), 6.0).is_ok());
        let req = request(JobStatus::Running, Some("other"), None);
        let err = plan(&starting, &req, 6.0).unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[test]
    fn test_completion_collects_output_urls() {
        let mut running = bound(JobStatus::Running, "cc");
        running.output_file_results = vec![OutputFileResult {
            name: "out".to_string(),
            file_base_name: "out.nwb".to_string(),
            url: "https://store/out.nwb".to_string(),
            size: Some(10),
        }];
        let req = request(JobStatus::Completed, Some("cc"), None);
        let planned = plan(&running, &req, 7.0).unwrap();
        assert_eq!(
            planned.patch.output_file_url_list,
            Patch::Set(vec!["https://store/out.nwb".to_string()])
        );
        assert_eq!(planned.patch.error, Patch::Set(None));
        assert_eq!(planned.patch.timestamp_finished_sec, Patch::Set(Some(7.0)));
    }

    #[test]
    fn test_completion_with_error_is_rejected() {
        let running = bound(JobStatus::Running, "cc");
        let req = request(JobStatus::Completed, Some("cc"), Some("boom"));
        let err = plan(&running, &req, 7.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
    }

    #[test]
    fn test_failure_requires_error() {
        let running = bound(JobStatus::Running, "cc");
        let err = plan(&running, &request(JobStatus::Failed, Some("cc"), None), 7.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));
        let req = request(JobStatus::Failed, Some("cc"), Some(""));
        let err = plan(&running, &req, 7.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidRequest(_)));

        let req = request(JobStatus::Failed, Some("cc"), Some("oom"));
        let planned = plan(&running, &req, 7.0).unwrap();
        assert_eq!(planned.patch.error, Patch::Set(Some("oom".to_string())));
    }

    #[test]
    fn test_pending_job_can_fail_without_client() {
        let req = request(JobStatus::Failed, None, Some("bad input"));
        let planned = plan(&job(JobStatus::Pending), &req, 7.0).unwrap();
        assert_eq!(planned.from, JobStatus::Pending);
        assert!(!planned.patch.compute_client_id.is_set());
    }

    #[test]
    fn test_bound_job_rejects_foreign_failure_report() {
        let running = bound(JobStatus::Running, "cc");
        let req = request(JobStatus::Failed, Some("other"), Some("x"));
        let err = plan(&running, &req, 7.0).unwrap_err();
        assert!(matches!(err, CoreError::Unauthorized(_)));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for status in [JobStatus::Completed, JobStatus::Failed] {
            for target in [
                JobStatus::Pending,
                JobStatus::Starting,
                JobStatus::Running,
                JobStatus::Completed,
                JobStatus::Failed,
            ] {
                let req = request(target, Some("cc"), Some("e"));
                let result = plan(&bound(status, "cc"), &req, 8.0);
                assert!(
                    matches!(result, Err(CoreError::InvalidState(_))),
                    "{} -> {}",
                    status,
                    target
                );
            }
        }
    }

    #[test]
    fn test_canceled_job_cannot_be_claimed() {
        let mut canceled = job(JobStatus::Pending);
        canceled.canceled = true;
        let req = request(JobStatus::Starting, Some("cc"), None);
        let err = plan(&canceled, &req, 5.0).unwrap_err();
        assert!(matches!(err, CoreError::InvalidState(_)));
    }
}
