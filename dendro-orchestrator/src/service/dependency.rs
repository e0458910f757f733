//! Dependency Service
//!
//! Decides runnability at creation and unblocks dependents when a job
//! completes.

use dendro_core::clock::now_sec;
use dendro_core::dependency;
use dendro_core::event::JobEvent;
use dendro_core::patch::{JobPatch, Patch};

use super::error::Result;
use super::notifier;
use crate::state::AppState;

/// Whether a job depending on `dependencies` may run now
pub async fn is_runnable(state: &AppState, dependencies: &[String]) -> Result<bool> {
    if dependencies.is_empty() {
        return Ok(true);
    }
    let found = state.jobs.find_by_ids(dependencies).await?;
    Ok(dependency::dependencies_satisfied(
        dependencies,
        &dependency::status_index(&found),
    ))
}

/// Re-check every blocked dependent of a job that just completed
///
/// Each dependent whose dependencies are now all complete is flipped to
/// runnable, but only while it is still pending and blocked, and announced
/// as a new pending job. Only one of several racing completions releases a
/// given dependent, and running this twice changes nothing the second time.
/// Returns how many jobs were unblocked.
pub async fn release_dependents(state: &AppState, completed_job_id: &str) -> Result<usize> {
    let dependents = state.jobs.find_blocked_dependents(completed_job_id).await?;
    let mut released = 0;

    for dependent in dependents {
        if !is_runnable(state, &dependent.job_dependencies).await? {
            tracing::debug!(
                job_id = %dependent.job_id,
                "Dependent still waiting after {} completed",
                completed_job_id
            );
            continue;
        }

        let patch = JobPatch {
            is_runnable: Patch::Set(true),
            timestamp_updated_sec: Patch::Set(now_sec()),
            ..Default::default()
        };
        if state.jobs.mark_runnable(&dependent.job_id, &patch).await? {
            tracing::info!(job_id = %dependent.job_id, "Job is now runnable");
            notifier::publish(
                state.notifier.as_ref(),
                JobEvent::NewPendingJob {
                    service_name: dependent.service_name.clone(),
                    job_id: dependent.job_id.clone(),
                },
            );
            released += 1;
        }
    }

    Ok(released)
}
