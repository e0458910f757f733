//! Fixtures shared by unit tests

use crate::domain::job::{Job, JobDefinition, JobStatus, RequiredResources};

pub(crate) fn job(status: JobStatus) -> Job {
    Job {
        job_id: "job-1".to_string(),
        job_private_key: Some("key".to_string()),
        service_name: "svc".to_string(),
        user_id: "alice".to_string(),
        batch_id: None,
        tags: vec![],
        job_definition: JobDefinition {
            app_name: "app".to_string(),
            processor_name: "proc".to_string(),
            input_files: vec![],
            output_files: vec![],
            parameters: vec![],
            cache_bust: None,
        },
        job_definition_hash: "hash".to_string(),
        job_dependencies: vec![],
        required_resources: RequiredResources {
            num_cpus: 1,
            num_gpus: 0,
            memory_gb: 1.0,
            time_sec: 60.0,
        },
        target_compute_client_ids: None,
        secrets: None,
        input_file_url_list: vec![],
        output_file_url_list: vec![],
        output_file_results: vec![],
        console_output_url: String::new(),
        resource_utilization_log_url: String::new(),
        timestamp_created_sec: 1.0,
        timestamp_updated_sec: 1.0,
        timestamp_starting_sec: None,
        timestamp_started_sec: None,
        timestamp_finished_sec: None,
        canceled: false,
        status,
        is_runnable: true,
        error: None,
        compute_client_id: None,
        compute_client_name: None,
        compute_client_user_id: None,
        image_uri: None,
    }
}

pub(crate) fn job_with(id: &str, status: JobStatus, num_cpus: u32, created: f64) -> Job {
    let mut job = job(status);
    job.job_id = id.to_string();
    job.required_resources.num_cpus = num_cpus;
    job.timestamp_created_sec = created;
    job
}
