//! Job domain types

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Target list entry matching every compute client
pub const ANY_COMPUTE_CLIENT: &str = "*";

/// Job record
///
/// Persisted by the orchestrator as a single document and handed to
/// compute clients for execution. `job_private_key` and `secrets` are
/// capabilities; see [`crate::secrets`] for the rules on when they may
/// leave the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub job_id: String,
    pub job_private_key: Option<String>,
    pub service_name: String,
    pub user_id: String,
    pub batch_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub job_definition: JobDefinition,
    pub job_definition_hash: String,
    #[serde(default)]
    pub job_dependencies: Vec<String>,
    pub required_resources: RequiredResources,
    pub target_compute_client_ids: Option<Vec<String>>,
    pub secrets: Option<Vec<JobSecret>>,
    #[serde(default)]
    pub input_file_url_list: Vec<String>,
    #[serde(default)]
    pub output_file_url_list: Vec<String>,
    #[serde(default)]
    pub output_file_results: Vec<OutputFileResult>,
    pub console_output_url: String,
    pub resource_utilization_log_url: String,
    pub timestamp_created_sec: f64,
    pub timestamp_updated_sec: f64,
    pub timestamp_starting_sec: Option<f64>,
    pub timestamp_started_sec: Option<f64>,
    pub timestamp_finished_sec: Option<f64>,
    #[serde(default)]
    pub canceled: bool,
    pub status: JobStatus,
    pub is_runnable: bool,
    pub error: Option<String>,
    pub compute_client_id: Option<String>,
    pub compute_client_name: Option<String>,
    pub compute_client_user_id: Option<String>,
    pub image_uri: Option<String>,
}

impl Job {
    /// A job with no target list, or one containing `"*"`, may run anywhere
    pub fn is_targeted_at(&self, compute_client_id: &str) -> bool {
        match &self.target_compute_client_ids {
            Some(ids) => ids.iter().any(|id| id == compute_client_id || id == ANY_COMPUTE_CLIENT),
            None => true,
        }
    }

    /// Whether a targeted job names no particular compute client
    pub fn is_untargeted(&self) -> bool {
        match &self.target_compute_client_ids {
            Some(ids) => ids.iter().any(|id| id == ANY_COMPUTE_CLIENT),
            None => true,
        }
    }

    pub fn secret(&self, name: &str) -> Option<&JobSecret> {
        self.secrets.as_ref()?.iter().find(|s| s.name == name)
    }
}

/// Job lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Starting,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Starting => "starting",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Starting or running: a compute client holds the job
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Starting | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "starting" => Ok(JobStatus::Starting),
            "running" => Ok(JobStatus::Running),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status '{}'", other)),
        }
    }
}

/// What to run: the part of a job that determines its identity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDefinition {
    pub app_name: String,
    pub processor_name: String,
    #[serde(default)]
    pub input_files: Vec<JobInputFile>,
    #[serde(default)]
    pub output_files: Vec<JobOutputFile>,
    #[serde(default)]
    pub parameters: Vec<JobParameter>,
    /// Opaque value that forces a distinct definition hash
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_bust: Option<String>,
}

impl JobDefinition {
    pub fn output_file(&self, name: &str) -> Option<&JobOutputFile> {
        self.output_files.iter().find(|o| o.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInputFile {
    pub name: String,
    pub file_base_name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutputFile {
    pub name: String,
    pub file_base_name: String,
    /// The compute client supplies the URL when reporting the output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_determined_at_runtime: Option<bool>,
}

impl JobOutputFile {
    pub fn is_runtime_url(&self) -> bool {
        self.url_determined_at_runtime.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParameter {
    pub name: String,
    #[serde(default)]
    pub value: serde_json::Value,
}

/// Resources a job needs from a compute slot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredResources {
    pub num_cpus: u32,
    pub num_gpus: u32,
    pub memory_gb: f64,
    pub time_sec: f64,
}

/// Named secret delivered to the executing compute client
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSecret {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for JobSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobSecret")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Output produced by a running job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputFileResult {
    pub name: String,
    pub file_base_name: String,
    pub url: String,
    pub size: Option<u64>,
}

/// Deterministic storage URL for a job output
pub fn output_file_url(
    base_url: &str,
    job: &Job,
    output_name: &str,
    file_base_name: &str,
) -> String {
    format!("{}/{}/{}", job_storage_prefix(base_url, job), output_name, file_base_name)
}

pub fn console_output_url(base_url: &str, job: &Job) -> String {
    format!("{}/console_output/output.txt", job_storage_prefix(base_url, job))
}

pub fn resource_utilization_log_url(base_url: &str, job: &Job) -> String {
    format!("{}/resource_utilization_log/log.jsonl", job_storage_prefix(base_url, job))
}

fn job_storage_prefix(base_url: &str, job: &Job) -> String {
    format!(
        "{}/{}/{}/{}/{}",
        base_url.trim_end_matches('/'),
        job.service_name,
        job.job_definition.app_name,
        job.job_definition.processor_name,
        job.job_id
    )
}
