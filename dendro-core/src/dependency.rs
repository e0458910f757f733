//! Dependency evaluation
//!
//! A job becomes runnable once every job it depends on has completed.
//! Lookups happen in the orchestrator; this module only decides.

use std::collections::HashMap;

use crate::domain::job::{Job, JobStatus};

/// True when there are no dependencies or every one is known and completed.
/// An unknown dependency keeps the job blocked.
pub fn dependencies_satisfied(
    dependencies: &[String],
    statuses: &HashMap<String, JobStatus>,
) -> bool {
    dependencies
        .iter()
        .all(|id| statuses.get(id) == Some(&JobStatus::Completed))
}

/// Status index over the dependency jobs that were found
pub fn status_index(jobs: &[Job]) -> HashMap<String, JobStatus> {
    jobs.iter().map(|j| (j.job_id.clone(), j.status)).collect()
}

/// Whether `job` is still waiting and lists `completed_job_id` among its dependencies
pub fn is_blocked_on(job: &Job, completed_job_id: &str) -> bool {
    job.status == JobStatus::Pending
        && !job.is_runnable
        && job.job_dependencies.iter().any(|d| d == completed_job_id)
}
