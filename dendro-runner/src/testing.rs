//! Fixtures shared by unit tests

use dendro_core::domain::job::{Job, JobDefinition, JobStatus, RequiredResources};

/// A job already admitted to compute client "cc"
pub(crate) fn job(job_id: &str) -> Job {
    Job {
        job_id: job_id.to_string(),
        job_private_key: Some("secret-key".to_string()),
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
        job_definition_hash: "h".to_string(),
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
        timestamp_created_sec: 0.0,
        timestamp_updated_sec: 0.0,
        timestamp_starting_sec: None,
        timestamp_started_sec: None,
        timestamp_finished_sec: None,
        canceled: false,
        status: JobStatus::Pending,
        is_runnable: true,
        error: None,
        compute_client_id: Some("cc".to_string()),
        compute_client_name: None,
        compute_client_user_id: None,
        image_uri: None,
    }
}
