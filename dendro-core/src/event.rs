//! Events published on a service's pub/sub channel

use serde::{Deserialize, Serialize};

use crate::domain::job::JobStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum JobEvent {
    NewPendingJob {
        service_name: String,
        job_id: String,
    },
    JobStatusChanged {
        service_name: String,
        job_id: String,
        status: JobStatus,
    },
    /// Ask compute clients of a service to poll right away
    PingComputeClients { service_name: String },
}

impl JobEvent {
    pub fn service_name(&self) -> &str {
        match self {
            JobEvent::NewPendingJob { service_name, .. }
            | JobEvent::JobStatusChanged { service_name, .. }
            | JobEvent::PingComputeClients { service_name } => service_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_format() {
        let event = JobEvent::JobStatusChanged {
            service_name: "svc".to_string(),
            job_id: "j1".to_string(),
            status: JobStatus::Completed,
        };
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            json!({
                "type": "jobStatusChanged",
                "serviceName": "svc",
                "jobId": "j1",
                "status": "completed"
            })
        );

        let ping = JobEvent::PingComputeClients {
            service_name: "svc".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&ping).unwrap(),
            json!({"type": "pingComputeClients", "serviceName": "svc"})
        );
    }
}
