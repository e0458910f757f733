//! Job poller
//!
//! Each poll asks the orchestrator which jobs this compute client may start.
//! Every admitted job gets a semaphore permit and its own task, which
//! claims it (`pending -> starting`), marks it running, executes it while a
//! cancellation watch runs beside it, and reports the result.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use dendro_client::ClientError;
use dendro_core::domain::job::{Job, JobStatus};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::repository::JobRepository;
use crate::service::{ExecutionOutcome, ExecutionService, spawn_cancel_watch};

/// Job poller that continuously polls for and executes jobs
pub struct JobPoller {
    config: Config,
    repository: Arc<dyn JobRepository>,
    executor: Arc<dyn ExecutionService>,
    semaphore: Arc<Semaphore>,
    /// Jobs with a live task in this process
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Another compute client claimed the job first, or it moved on
fn lost_claim(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ClientError>()
        .is_some_and(|e| e.is_concurrent_modification() || e.is_invalid_state())
}

/// Drops the job from the in-flight set when its task ends
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    job_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|p| p.into_inner());
        in_flight.remove(&self.job_id);
    }
}

impl JobPoller {
    /// Creates a new job poller
    pub fn new(
        config: Config,
        repository: Arc<dyn JobRepository>,
        executor: Arc<dyn ExecutionService>,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_parallel_jobs));
        Self {
            config,
            repository,
            executor,
            semaphore,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Starts the polling loop
    pub async fn run(&self) -> Result<()> {
        info!("Starting job poller (interval: {:?})", self.config.poll_interval);

        let mut interval = time::interval(self.config.poll_interval);

        loop {
            interval.tick().await;

            debug!("Polling for runnable jobs");

            match self.poll_once().await {
                Ok(spawned) => {
                    if spawned > 0 {
                        info!("Started {} job(s) this cycle", spawned);
                    }
                }
                Err(e) => {
                    error!("Error during poll cycle: {:#}", e);
                }
            }
        }
    }

    fn is_in_flight(&self, job_id: &str) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(job_id)
    }

    fn track(&self, job_id: &str) -> InFlightGuard {
        self.in_flight
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(job_id.to_string());
        InFlightGuard {
            in_flight: Arc::clone(&self.in_flight),
            job_id: job_id.to_string(),
        }
    }

    /// Performs a single poll cycle, returning the number of tasks spawned
    pub async fn poll_once(&self) -> Result<usize> {
        let response = self
            .repository
            .fetch_runnable_jobs()
            .await
            .context("Failed to fetch runnable jobs")?;

        for orphan in response.running_jobs.iter().filter(|j| !self.is_in_flight(&j.job_id)) {
            self.fail_orphan(orphan).await;
        }

        if response.runnable_jobs.is_empty() {
            debug!("No jobs available");
            return Ok(0);
        }

        let mut spawned = 0;
        for job in response.runnable_jobs {
            if self.is_in_flight(&job.job_id) {
                continue;
            }

            // Try to acquire semaphore permit, skip if at max capacity
            let Ok(permit) = self.semaphore.clone().try_acquire_owned() else {
                debug!("Max parallel jobs reached, skipping job {} for now", job.job_id);
                break;
            };
            self.spawn_job_task(job, permit);
            spawned += 1;
        }

        Ok(spawned)
    }

    /// A job bound to this client that no task here is running, left over
    /// from an earlier process
    async fn fail_orphan(&self, job: &Job) {
        warn!(job_id = %job.job_id, status = %job.status, "Found orphaned job, marking it failed");
        let error = "compute client restarted while the job was active".to_string();
        if let Err(e) = self.repository.set_status(job, JobStatus::Failed, Some(error)).await {
            warn!(job_id = %job.job_id, "Failed to fail orphaned job: {:#}", e);
        }
    }

    /// Spawns a task to execute a single job
    fn spawn_job_task(&self, job: Job, permit: OwnedSemaphorePermit) {
        let guard = self.track(&job.job_id);
        let repository = Arc::clone(&self.repository);
        let executor = Arc::clone(&self.executor);
        let cancel_check_interval = self.config.cancel_check_interval;

        tokio::spawn(async move {
            let job_id = job.job_id.clone();
            let result = Self::execute_job(job, repository, executor, cancel_check_interval).await;
            if let Err(e) = result {
                error!("Failed to execute job {}: {:#}", job_id, e);
            }
            // Permit and guard are released when dropped
            drop(permit);
            drop(guard);
        });
    }

    /// Drives one job from claim to final status
    async fn execute_job(
        job: Job,
        repository: Arc<dyn JobRepository>,
        executor: Arc<dyn ExecutionService>,
        cancel_check_interval: time::Duration,
    ) -> Result<()> {
        match repository.set_status(&job, JobStatus::Starting, None).await {
            Ok(()) => {}
            Err(e) if lost_claim(&e) => {
                debug!(job_id = %job.job_id, "Job was claimed elsewhere, skipping");
                return Ok(());
            }
            Err(e) => return Err(e.context("Failed to claim job")),
        }
        info!(job_id = %job.job_id, "Claimed job");

        repository
            .set_status(&job, JobStatus::Running, None)
            .await
            .context("Failed to mark job running")?;

        let (canceled, watch_handle) =
            spawn_cancel_watch(Arc::clone(&repository), job.job_id.clone(), cancel_check_interval);
        let outcome = executor.execute(&job, canceled).await;
        watch_handle.abort();

        let (status, error) = match outcome {
            Ok(ExecutionOutcome::Succeeded) => (JobStatus::Completed, None),
            Ok(ExecutionOutcome::Failed(message)) => (JobStatus::Failed, Some(message)),
            Ok(ExecutionOutcome::Canceled) => {
                (JobStatus::Failed, Some("job was canceled".to_string()))
            }
            Err(e) => (JobStatus::Failed, Some(format!("{:#}", e))),
        };

        info!(job_id = %job.job_id, status = %status, "Job finished");
        repository
            .set_status(&job, status, error)
            .await
            .with_context(|| format!("Failed to report job as {}", status))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::job;
    use async_trait::async_trait;
    use dendro_core::dto::compute_client::GetRunnableJobsResponse;
    use std::time::Duration;
    use tokio::sync::watch;

    #[derive(Default)]
    struct FakeRepository {
        runnable: Mutex<Vec<Job>>,
        running: Mutex<Vec<Job>>,
        reports: Mutex<Vec<(String, JobStatus, Option<String>)>>,
        claimed_elsewhere: Mutex<HashSet<String>>,
        canceled: Mutex<HashSet<String>>,
    }

    impl FakeRepository {
        fn reports(&self) -> Vec<(String, JobStatus, Option<String>)> {
            self.reports.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl JobRepository for FakeRepository {
        async fn fetch_runnable_jobs(&self) -> Result<GetRunnableJobsResponse> {
            Ok(GetRunnableJobsResponse {
                runnable_jobs: self.runnable.lock().unwrap().drain(..).collect(),
                running_jobs: self.running.lock().unwrap().drain(..).collect(),
            })
        }

        async fn set_status(
            &self,
            job: &Job,
            status: JobStatus,
            error: Option<String>,
        ) -> Result<()> {
            let claimed_elsewhere = self.claimed_elsewhere.lock().unwrap().contains(&job.job_id);
            if status == JobStatus::Starting && claimed_elsewhere {
                return Err(ClientError::api_error(
                    409,
                    r#"{"error":"job is no longer pending","kind":"concurrent_modification"}"#,
                )
                .into());
            }
            self.reports.lock().unwrap().push((job.job_id.clone(), status, error));
            Ok(())
        }

        async fn is_canceled(&self, job_id: &str) -> Result<bool> {
            Ok(self.canceled.lock().unwrap().contains(job_id))
        }
    }

    /// Succeeds unless the job id says otherwise; "cancel" jobs wait for the watch
    struct FakeExecutor;

    #[async_trait]
    impl ExecutionService for FakeExecutor {
        async fn execute(
            &self,
            job: &Job,
            mut canceled: watch::Receiver<bool>,
        ) -> Result<ExecutionOutcome> {
            if job.job_id.starts_with("fail") {
                return Ok(ExecutionOutcome::Failed("exit 1".to_string()));
            }
            if job.job_id.starts_with("cancel") {
                while !*canceled.borrow_and_update() {
                    canceled.changed().await?;
                }
                return Ok(ExecutionOutcome::Canceled);
            }
            Ok(ExecutionOutcome::Succeeded)
        }
    }

    fn poller(repository: Arc<FakeRepository>, max_parallel_jobs: usize) -> JobPoller {
        let mut config = Config::new(
            "cc".to_string(),
            "key".to_string(),
            "http://localhost:8080".to_string(),
        );
        config.max_parallel_jobs = max_parallel_jobs;
        config.cancel_check_interval = Duration::from_millis(10);
        JobPoller::new(config, repository, Arc::new(FakeExecutor))
    }

    async fn settle(poller: &JobPoller) {
        for _ in 0..200 {
            if poller.in_flight.lock().unwrap().is_empty() {
                return;
            }
            time::sleep(Duration::from_millis(5)).await;
        }
        panic!("jobs did not finish");
    }

    fn statuses(reports: &[(String, JobStatus, Option<String>)], job_id: &str) -> Vec<JobStatus> {
        reports.iter().filter(|r| r.0 == job_id).map(|r| r.1).collect()
    }

    #[tokio::test]
    async fn test_job_runs_through_lifecycle() {
        let repository = Arc::new(FakeRepository::default());
        repository.runnable.lock().unwrap().extend([job("ok-1"), job("fail-1")]);
        let poller = poller(repository.clone(), 4);

        assert_eq!(poller.poll_once().await.unwrap(), 2);
        settle(&poller).await;

        let reports = repository.reports();
        assert_eq!(
            statuses(&reports, "ok-1"),
            vec![JobStatus::Starting, JobStatus::Running, JobStatus::Completed]
        );
        assert_eq!(
            statuses(&reports, "fail-1"),
            vec![JobStatus::Starting, JobStatus::Running, JobStatus::Failed]
        );
        assert!(reports.iter().any(|r| r.0 == "fail-1" && r.2.as_deref() == Some("exit 1")));
    }

    #[tokio::test]
    async fn test_lost_claim_is_skipped_quietly() {
        let repository = Arc::new(FakeRepository::default());
        repository.runnable.lock().unwrap().push(job("ok-raced"));
        repository.claimed_elsewhere.lock().unwrap().insert("ok-raced".to_string());
        let poller = poller(repository.clone(), 1);

        assert_eq!(poller.poll_once().await.unwrap(), 1);
        settle(&poller).await;
        assert!(repository.reports().is_empty());
    }

    #[tokio::test]
    async fn test_parallelism_is_bounded() {
        let repository = Arc::new(FakeRepository::default());
        repository
            .runnable
            .lock()
            .unwrap()
            .extend([job("cancel-1"), job("cancel-2"), job("ok-3")]);
        let poller = poller(repository.clone(), 2);

        assert_eq!(poller.poll_once().await.unwrap(), 2);
        assert!(poller.is_in_flight("cancel-1"));
        assert!(!poller.is_in_flight("ok-3"));

        repository
            .canceled
            .lock()
            .unwrap()
            .extend(["cancel-1".to_string(), "cancel-2".to_string()]);
        settle(&poller).await;

        let reports = repository.reports();
        assert_eq!(statuses(&reports, "cancel-1").last(), Some(&JobStatus::Failed));
        assert!(reports.iter().any(|r| r.2.as_deref() == Some("job was canceled")));
    }

    #[tokio::test]
    async fn test_orphaned_running_job_is_failed() {
        let repository = Arc::new(FakeRepository::default());
        let mut orphan = job("ok-orphan");
        orphan.status = JobStatus::Running;
        repository.running.lock().unwrap().push(orphan);
        let poller = poller(repository.clone(), 1);

        assert_eq!(poller.poll_once().await.unwrap(), 0);
        assert_eq!(statuses(&repository.reports(), "ok-orphan"), vec![JobStatus::Failed]);
    }
}
