//! Execution service
//!
//! Runs one job as a child process in its own working directory. The
//! process learns which job it is through environment variables and talks
//! to the orchestrator itself (outputs, secrets) with the job private key.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use dendro_core::domain::job::Job;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How a job execution ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Succeeded,
    Failed(String),
    Canceled,
}

#[async_trait]
pub trait ExecutionService: Send + Sync {
    /// Run `job` to the end, stopping early once `canceled` turns true
    async fn execute(&self, job: &Job, canceled: watch::Receiver<bool>) -> Result<ExecutionOutcome>;
}

/// Launches the configured command for every job
pub struct ProcessExecutionService {
    command: Vec<String>,
    workdir: PathBuf,
    api_url: String,
}

impl ProcessExecutionService {
    pub fn new(command: Vec<String>, workdir: PathBuf, api_url: String) -> Self {
        Self {
            command,
            workdir,
            api_url,
        }
    }

    fn build_command(&self, job: &Job, dir: &Path) -> Result<Command> {
        let (program, args) = self
            .command
            .split_first()
            .context("job command is empty")?;

        let mut command = Command::new(program);
        command
            .args(args)
            .current_dir(dir)
            .env("DENDRO_JOB_ID", &job.job_id)
            .env("DENDRO_API_URL", &self.api_url)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(key) = &job.job_private_key {
            command.env("DENDRO_JOB_PRIVATE_KEY", key);
        }
        Ok(command)
    }
}

/// Wall-clock limit from the job's resource request; none when unset
fn time_limit(job: &Job) -> Option<Duration> {
    let secs = job.required_resources.time_sec;
    (secs.is_finite() && secs > 0.0).then(|| Duration::from_secs_f64(secs))
}

enum Stop {
    Exited(ExitStatus),
    Canceled,
    TimedOut,
}

async fn kill(child: &mut Child, job_id: &str) {
    if let Err(e) = child.kill().await {
        warn!(job_id = %job_id, "Failed to kill job process: {}", e);
    }
}

/// Resolves once the watch reports cancellation; never if the sender is gone
async fn wait_canceled(mut canceled: watch::Receiver<bool>) {
    loop {
        if *canceled.borrow_and_update() {
            return;
        }
        if canceled.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl ExecutionService for ProcessExecutionService {
    async fn execute(
        &self,
        job: &Job,
        canceled: watch::Receiver<bool>,
    ) -> Result<ExecutionOutcome> {
        let dir = self.workdir.join(&job.job_id);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create work dir {}", dir.display()))?;

        let mut child = self
            .build_command(job, &dir)?
            .spawn()
            .with_context(|| format!("Failed to launch {:?}", self.command))?;
        info!(job_id = %job.job_id, pid = ?child.id(), "Job process started");

        let deadline = async {
            match time_limit(job) {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        let stop = tokio::select! {
            status = child.wait() => {
                Stop::Exited(status.context("Failed to wait for job process")?)
            }
            _ = wait_canceled(canceled) => Stop::Canceled,
            _ = deadline => Stop::TimedOut,
        };

        let outcome = match stop {
            Stop::Exited(status) => {
                debug!(job_id = %job.job_id, ?status, "Job process exited");
                if status.success() {
                    ExecutionOutcome::Succeeded
                } else {
                    ExecutionOutcome::Failed(match status.code() {
                        Some(code) => format!("job process exited with code {}", code),
                        None => "job process was killed by a signal".to_string(),
                    })
                }
            }
            Stop::Canceled => {
                info!(job_id = %job.job_id, "Job canceled, stopping process");
                kill(&mut child, &job.job_id).await;
                ExecutionOutcome::Canceled
            }
            Stop::TimedOut => {
                warn!(job_id = %job.job_id, "Job exceeded its time limit, stopping process");
                kill(&mut child, &job.job_id).await;
                ExecutionOutcome::Failed(format!(
                    "job exceeded its time limit of {} seconds",
                    job.required_resources.time_sec
                ))
            }
        };

        Ok(outcome)
    }
}
