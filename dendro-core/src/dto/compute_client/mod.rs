//! Compute client DTOs

use serde::{Deserialize, Serialize};

use super::present;
use crate::domain::compute_client::ComputeSlot;
use crate::domain::job::Job;
use crate::error::CoreError;
use crate::patch::{ComputeClientPatch, Patch};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterComputeClientRequest {
    pub compute_client_name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub service_names: Vec<String>,
    #[serde(default)]
    pub compute_slots: Vec<ComputeSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_jobs_for_users: Option<Vec<String>>,
}

impl RegisterComputeClientRequest {
    pub fn validate(self) -> Result<Self, CoreError> {
        if self.compute_client_name.trim().is_empty() {
            return Err(CoreError::InvalidRequest("computeClientName is required".to_string()));
        }
        validate_service_names(&self.service_names)?;
        validate_slots(&self.compute_slots)?;
        Ok(self)
    }
}

/// Returned once at registration; the private key is not retrievable later
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterComputeClientResponse {
    pub compute_client_id: String,
    pub compute_client_private_key: String,
}

/// Owner update of a compute client's configuration
///
/// Absent fields are left alone. `processJobsForUsers: null` clears the
/// allow-list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetComputeClientInfoRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_client_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_names: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compute_slots: Option<Vec<ComputeSlot>>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub process_jobs_for_users: Option<Option<Vec<String>>>,
}

impl SetComputeClientInfoRequest {
    pub fn into_patch(self) -> Result<ComputeClientPatch, CoreError> {
        let mut patch = ComputeClientPatch::default();
        if let Some(name) = self.compute_client_name {
            if name.trim().is_empty() {
                return Err(CoreError::InvalidRequest(
                    "computeClientName cannot be empty".to_string(),
                ));
            }
            patch.compute_client_name = Patch::Set(name);
        }
        if let Some(description) = self.description {
            patch.description = Patch::Set(description);
        }
        if let Some(service_names) = self.service_names {
            validate_service_names(&service_names)?;
            patch.service_names = Patch::Set(service_names);
        }
        if let Some(slots) = self.compute_slots {
            validate_slots(&slots)?;
            patch.compute_slots = Patch::Set(slots);
        }
        if let Some(users) = self.process_jobs_for_users {
            patch.process_jobs_for_users = Patch::Set(users);
        }
        Ok(patch)
    }
}

fn validate_service_names(names: &[String]) -> Result<(), CoreError> {
    if names.iter().any(|n| n.trim().is_empty()) {
        return Err(CoreError::InvalidRequest(
            "serviceNames cannot contain empty names".to_string(),
        ));
    }
    Ok(())
}

fn validate_slots(slots: &[ComputeSlot]) -> Result<(), CoreError> {
    if let Some(index) = slots.iter().position(|s| !s.is_well_formed()) {
        return Err(CoreError::InvalidRequest(format!(
            "computeSlots[{}] has inverted or invalid bounds",
            index
        )));
    }
    Ok(())
}

/// Poll request from a compute client
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRunnableJobsRequest {
    /// Fetch this job only, ignoring slot capacity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default)]
    pub single_job: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRunnableJobsResponse {
    pub runnable_jobs: Vec<Job>,
    pub running_jobs: Vec<Job>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_absent_allow_list_is_left_alone() {
        let req: SetComputeClientInfoRequest =
            serde_json::from_value(json!({"description": "gpu box"})).unwrap();
        let patch = req.into_patch().unwrap();
        assert_eq!(patch.description, Patch::Set("gpu box".to_string()));
        assert_eq!(patch.process_jobs_for_users, Patch::Unchanged);
    }

    #[test]
    fn test_null_allow_list_clears_it() {
        let req: SetComputeClientInfoRequest =
            serde_json::from_value(json!({"processJobsForUsers": null})).unwrap();
        assert_eq!(req.into_patch().unwrap().process_jobs_for_users, Patch::Set(None));
    }

    #[test]
    fn test_register_rejects_inverted_slot() {
        let req: RegisterComputeClientRequest = serde_json::from_value(json!({
            "computeClientName": "lab",
            "serviceNames": ["svc"],
            "computeSlots": [{
                "numCpusMin": 8, "numCpusMax": 2,
                "numGpusMin": 0, "numGpusMax": 0,
                "memoryGbMin": 0, "memoryGbMax": 4,
                "timeSecMin": 0, "timeSecMax": 100,
                "multiplicity": 1
            }]
        }))
        .unwrap();
        assert!(matches!(req.validate(), Err(CoreError::InvalidRequest(_))));
    }
}
