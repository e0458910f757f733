//! Job DTOs

use std::collections::HashSet;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::domain::job::{Job, JobDefinition, JobSecret, JobStatus, RequiredResources};
use crate::error::CoreError;

/// Request to submit a job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub service_name: String,
    /// Must match the authenticated user when given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub job_definition: JobDefinition,
    #[serde(default)]
    pub job_dependencies: Vec<String>,
    pub required_resources: RequiredResources,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_compute_client_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<JobSecret>>,
    /// Always create a new job, ignoring equivalent existing ones
    #[serde(default)]
    pub skip_cache: bool,
    /// Create a new job when the only equivalent one has failed
    #[serde(default)]
    pub rerun_failing: bool,
    /// With `rerun_failing`, delete the failed job being replaced
    #[serde(default)]
    pub delete_failing: bool,
}

/// A [`CreateJobRequest`] that passed [`CreateJobRequest::validate`]
#[derive(Debug, Clone)]
pub struct ValidatedCreateJob(CreateJobRequest);

impl ValidatedCreateJob {
    pub fn into_inner(self) -> CreateJobRequest {
        self.0
    }
}

impl Deref for ValidatedCreateJob {
    type Target = CreateJobRequest;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl CreateJobRequest {
    pub fn validate(self) -> Result<ValidatedCreateJob, CoreError> {
        require_non_empty("serviceName", &self.service_name)?;
        validate_definition(&self.job_definition)?;

        let resources = &self.required_resources;
        if !(resources.memory_gb.is_finite() && resources.memory_gb >= 0.0) {
            return Err(invalid("requiredResources.memoryGb must be a non-negative number"));
        }
        if !(resources.time_sec.is_finite() && resources.time_sec >= 0.0) {
            return Err(invalid("requiredResources.timeSec must be a non-negative number"));
        }

        if self.job_dependencies.iter().any(|d| d.is_empty()) {
            return Err(invalid("jobDependencies cannot contain empty ids"));
        }
        if let Some(targets) = &self.target_compute_client_ids {
            if targets.is_empty() {
                return Err(invalid("targetComputeClientIds cannot be an empty list"));
            }
            if targets.iter().any(|t| t.is_empty()) {
                return Err(invalid("targetComputeClientIds cannot contain empty ids"));
            }
        }
        if let Some(secrets) = &self.secrets {
            unique_names("secrets", secrets.iter().map(|s| s.name.as_str()))?;
        }

        Ok(ValidatedCreateJob(self))
    }
}

fn validate_definition(definition: &JobDefinition) -> Result<(), CoreError> {
    require_non_empty("jobDefinition.appName", &definition.app_name)?;
    require_non_empty("jobDefinition.processorName", &definition.processor_name)?;
    unique_names(
        "jobDefinition.inputFiles",
        definition.input_files.iter().map(|f| f.name.as_str()),
    )?;
    unique_names(
        "jobDefinition.outputFiles",
        definition.output_files.iter().map(|f| f.name.as_str()),
    )?;
    unique_names(
        "jobDefinition.parameters",
        definition.parameters.iter().map(|p| p.name.as_str()),
    )?;

    if let Some(input) = definition.input_files.iter().find(|f| f.url.is_empty()) {
        return Err(invalid(format!("input file '{}' has no url", input.name)));
    }
    if let Some(output) = definition.output_files.iter().find(|f| f.file_base_name.is_empty()) {
        return Err(invalid(format!("output file '{}' has no fileBaseName", output.name)));
    }
    Ok(())
}

fn require_non_empty(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(invalid(format!("{} is required", field)));
    }
    Ok(())
}

fn unique_names<'a>(field: &str, names: impl Iterator<Item = &'a str>) -> Result<(), CoreError> {
    let mut seen = HashSet::new();
    for name in names {
        if name.is_empty() {
            return Err(invalid(format!("{} entries must be named", field)));
        }
        if !seen.insert(name) {
            return Err(invalid(format!("{} has duplicate name '{}'", field, name)));
        }
    }
    Ok(())
}

fn invalid(message: impl Into<String>) -> CoreError {
    CoreError::InvalidRequest(message.into())
}

/// Look up an existing job by what it would run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindJobByDefinitionRequest {
    pub service_name: String,
    pub job_definition: JobDefinition,
}

impl FindJobByDefinitionRequest {
    pub fn validate(self) -> Result<Self, CoreError> {
        require_non_empty("serviceName", &self.service_name)?;
        validate_definition(&self.job_definition)?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindJobByDefinitionResponse {
    pub found: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
}

/// Filtered job listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,
    /// Jobs must carry every listed tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

pub const MAX_QUERY_LIMIT: usize = 1000;

impl JobQuery {
    pub fn validate(mut self) -> Result<Self, CoreError> {
        let scoped = self.service_name.is_some()
            || self.user_id.is_some()
            || self.batch_id.is_some()
            || self.compute_client_id.is_some()
            || self.job_ids.is_some();
        if !scoped {
            return Err(invalid(
                "one of serviceName, userId, batchId, computeClientId or jobIds is required",
            ));
        }
        self.limit = Some(self.limit.unwrap_or(MAX_QUERY_LIMIT).min(MAX_QUERY_LIMIT));
        Ok(self)
    }

    pub fn matches(&self, job: &Job) -> bool {
        fn eq(filter: &Option<String>, value: &str) -> bool {
            filter.as_deref().is_none_or(|f| f == value)
        }
        fn eq_opt(filter: &Option<String>, value: Option<&str>) -> bool {
            filter.as_deref().is_none_or(|f| Some(f) == value)
        }

        eq(&self.service_name, &job.service_name)
            && eq(&self.user_id, &job.user_id)
            && eq_opt(&self.batch_id, job.batch_id.as_deref())
            && eq_opt(&self.compute_client_id, job.compute_client_id.as_deref())
            && self.status.is_none_or(|s| s == job.status)
            && self
                .tags
                .as_ref()
                .is_none_or(|tags| tags.iter().all(|t| job.tags.contains(t)))
            && self
                .job_ids
                .as_ref()
                .is_none_or(|ids| ids.contains(&job.job_id))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobQueryResponse {
    pub jobs: Vec<Job>,
}

/// Query string of `GET /api/jobs/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetJobParams {
    #[serde(default)]
    pub include_private_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_client_id: Option<String>,
}

/// Status report from a compute client (or an operator holding the job key)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetJobStatusRequest {
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uri: Option<String>,
}

/// Record an output produced by a running job
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetOutputFileResultRequest {
    pub name: String,
    /// Required for outputs whose url is determined at runtime
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetJobSecretRequest {
    pub compute_client_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteJobsRequest {
    pub job_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl DeleteJobsRequest {
    pub fn validate(self) -> Result<Self, CoreError> {
        if self.job_ids.is_empty() {
            return Err(invalid("jobIds cannot be empty"));
        }
        Ok(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteJobsResponse {
    /// Never-started jobs removed outright
    pub deleted_count: usize,
    /// Jobs moved to the archive
    pub archived_count: usize,
}
