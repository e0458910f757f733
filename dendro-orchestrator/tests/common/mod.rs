#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use dendro_core::domain::compute_client::ComputeSlot;
use dendro_core::domain::job::{Job, JobStatus};
use dendro_core::domain::service::{Service, ServiceUser};
use dendro_core::dto::compute_client::RegisterComputeClientRequest;
use dendro_core::dto::job::{CreateJobRequest, SetJobStatusRequest};
use dendro_core::event::JobEvent;
use dendro_orchestrator::AppState;
use dendro_orchestrator::config::{Config, StoreBackend};
use dendro_orchestrator::repository::JobStore;
use dendro_orchestrator::repository::memory::{
    MemoryComputeClientStore, MemoryIdentityResolver, MemoryJobStore, MemoryServiceDirectory,
};
use dendro_orchestrator::service::notifier::Notifier;
use dendro_orchestrator::service::{compute_client_service, job_service};
use serde_json::{Value, json};

pub const SERVICE: &str = "spikesort";
pub const OUTPUT_BASE: &str = "https://store.test/out";

pub const ALICE: &str = "alice-token"; // service owner
pub const BOB: &str = "bob-token"; // may create jobs
pub const CAROL: &str = "carol-token"; // may process jobs
pub const DAVE: &str = "dave-token"; // admin
pub const EVE: &str = "eve-token"; // not a member

/// Captures every published event
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, JobEvent)>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<JobEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn channels(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn publish(&self, channel: &str, event: JobEvent) {
        self.events.lock().unwrap().push((channel.to_string(), event));
    }
}

pub struct TestApp {
    pub state: AppState,
    pub jobs: Arc<MemoryJobStore>,
    pub notifier: Arc<RecordingNotifier>,
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

pub async fn test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let mut config = Config {
        store: StoreBackend::Memory,
        output_base_url: OUTPUT_BASE.to_string(),
        ..Config::default()
    };
    configure(&mut config);

    let services = MemoryServiceDirectory::new();
    services
        .insert(Service {
            service_name: SERVICE.to_string(),
            user_id: "alice".to_string(),
            users: vec![
                member("bob", false, true, false),
                member("carol", false, false, true),
                member("dave", true, false, false),
            ],
        })
        .await;
    services
        .insert(Service {
            service_name: "other".to_string(),
            user_id: "eve".to_string(),
            users: vec![],
        })
        .await;

    let identity = MemoryIdentityResolver::new();
    for (token, user) in [
        (ALICE, "alice"),
        (BOB, "bob"),
        (CAROL, "carol"),
        (DAVE, "dave"),
        (EVE, "eve"),
    ] {
        identity.insert(token, user).await;
    }

    let jobs = Arc::new(MemoryJobStore::with_seed(7));
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState {
        jobs: jobs.clone(),
        compute_clients: Arc::new(MemoryComputeClientStore::new()),
        services: Arc::new(services),
        identity: Arc::new(identity),
        notifier: notifier.clone(),
        config: Arc::new(config),
    };

    TestApp { state, jobs, notifier }
}

fn member(user_id: &str, admin: bool, create_jobs: bool, process_jobs: bool) -> ServiceUser {
    ServiceUser {
        user_id: user_id.to_string(),
        admin,
        create_jobs,
        process_jobs,
    }
}

pub fn definition(processor: &str, threshold: f64) -> Value {
    json!({
        "appName": "mountainsort",
        "processorName": processor,
        "inputFiles": [
            { "name": "recording", "fileBaseName": "rec.nwb", "url": "https://data.test/rec.nwb" }
        ],
        "outputFiles": [
            { "name": "sorting", "fileBaseName": "sorting.nwb" },
            { "name": "report", "fileBaseName": "report.html", "urlDeterminedAtRuntime": true }
        ],
        "parameters": [
            { "name": "threshold", "value": threshold },
            { "name": "channels", "value": [1, 2, 3] }
        ]
    })
}

pub fn job_request(definition: Value, extra: Value) -> CreateJobRequest {
    let mut body = json!({
        "serviceName": SERVICE,
        "jobDefinition": definition,
        "requiredResources": { "numCpus": 4, "numGpus": 0, "memoryGb": 8.0, "timeSec": 3600.0 }
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        for (key, value) in extra {
            body.insert(key.clone(), value.clone());
        }
    }
    serde_json::from_value(body).unwrap()
}

pub async fn create(app: &TestApp, token: &str, req: CreateJobRequest) -> Job {
    job_service::create_job(&app.state, Some(token), req.validate().unwrap())
        .await
        .unwrap()
}

/// Stored copy of a job, private key included
pub async fn stored(app: &TestApp, job_id: &str) -> Job {
    app.jobs.find_by_id(job_id).await.unwrap().unwrap()
}

pub async fn job_key(app: &TestApp, job_id: &str) -> String {
    stored(app, job_id).await.job_private_key.unwrap()
}

pub fn slot(cpus_max: u32, memory_max: f64, multiplicity: u32) -> ComputeSlot {
    ComputeSlot {
        num_cpus_min: 0,
        num_cpus_max: cpus_max,
        num_gpus_min: 0,
        num_gpus_max: 0,
        memory_gb_min: 0.0,
        memory_gb_max: memory_max,
        time_sec_min: 0.0,
        time_sec_max: 86400.0,
        multiplicity,
    }
}

/// Registers a compute client owned by carol; returns (id, private key)
pub async fn register_client(app: &TestApp, slots: Vec<ComputeSlot>) -> (String, String) {
    let req = RegisterComputeClientRequest {
        compute_client_name: "lab-box".to_string(),
        description: String::new(),
        service_names: vec![SERVICE.to_string()],
        compute_slots: slots,
        process_jobs_for_users: None,
    };
    let response = compute_client_service::register_compute_client(&app.state, Some(CAROL), req)
        .await
        .unwrap();
    (response.compute_client_id, response.compute_client_private_key)
}

pub fn status(status: JobStatus, compute_client_id: Option<&str>) -> SetJobStatusRequest {
    SetJobStatusRequest {
        status,
        compute_client_id: compute_client_id.map(str::to_string),
        error: None,
        image_uri: None,
    }
}

/// Drive a job through starting and running on a compute client
pub async fn start(app: &TestApp, job_id: &str, compute_client_id: &str) {
    let key = job_key(app, job_id).await;
    for next in [JobStatus::Starting, JobStatus::Running] {
        job_service::set_job_status(
            &app.state,
            job_id,
            Some(&key),
            status(next, Some(compute_client_id)),
        )
        .await
        .unwrap();
    }
}

pub async fn complete(app: &TestApp, job_id: &str, compute_client_id: &str) {
    let key = job_key(app, job_id).await;
    job_service::set_job_status(
        &app.state,
        job_id,
        Some(&key),
        status(JobStatus::Completed, Some(compute_client_id)),
    )
    .await
    .unwrap();
}
