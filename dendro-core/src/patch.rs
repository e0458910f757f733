//! Partial updates
//!
//! A patch names exactly the fields an operation changes. Stores apply it
//! atomically: the in-memory store field by field under its lock, the
//! Postgres store as a JSONB merge of [`JobPatch::to_document`].

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::compute_client::{ComputeClient, ComputeSlot};
use crate::domain::job::{Job, JobStatus, OutputFileResult};

/// A field is either left alone or overwritten
#[derive(Debug, Clone, PartialEq)]
pub enum Patch<T> {
    Unchanged,
    Set(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Patch::Unchanged
    }
}

impl<T: Clone> Patch<T> {
    pub fn is_set(&self) -> bool {
        matches!(self, Patch::Set(_))
    }

    pub fn as_set(&self) -> Option<&T> {
        match self {
            Patch::Set(value) => Some(value),
            Patch::Unchanged => None,
        }
    }

    pub fn apply_to(&self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value.clone();
        }
    }
}

impl<T: Serialize> Patch<T> {
    fn write_into(&self, key: &str, doc: &mut Map<String, Value>) {
        if let Patch::Set(value) = self {
            // Serializing plain data into a Value cannot fail
            if let Ok(value) = serde_json::to_value(value) {
                doc.insert(key.to_string(), value);
            }
        }
    }
}

/// Mutable job fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobPatch {
    pub status: Patch<JobStatus>,
    pub is_runnable: Patch<bool>,
    pub canceled: Patch<bool>,
    pub error: Patch<Option<String>>,
    pub tags: Patch<Vec<String>>,
    pub compute_client_id: Patch<Option<String>>,
    pub compute_client_name: Patch<Option<String>>,
    pub compute_client_user_id: Patch<Option<String>>,
    pub output_file_url_list: Patch<Vec<String>>,
    pub output_file_results: Patch<Vec<OutputFileResult>>,
    pub image_uri: Patch<Option<String>>,
    pub timestamp_updated_sec: Patch<f64>,
    pub timestamp_starting_sec: Patch<Option<f64>>,
    pub timestamp_started_sec: Patch<Option<f64>>,
    pub timestamp_finished_sec: Patch<Option<f64>>,
}

impl JobPatch {
    /// A patch that only refreshes the update timestamp
    pub fn touched(now: f64) -> Self {
        Self {
            timestamp_updated_sec: Patch::Set(now),
            ..Default::default()
        }
    }

    pub fn apply(&self, job: &mut Job) {
        self.status.apply_to(&mut job.status);
        self.is_runnable.apply_to(&mut job.is_runnable);
        self.canceled.apply_to(&mut job.canceled);
        self.error.apply_to(&mut job.error);
        self.tags.apply_to(&mut job.tags);
        self.compute_client_id.apply_to(&mut job.compute_client_id);
        self.compute_client_name.apply_to(&mut job.compute_client_name);
        self.compute_client_user_id.apply_to(&mut job.compute_client_user_id);
        self.output_file_url_list.apply_to(&mut job.output_file_url_list);
        self.output_file_results.apply_to(&mut job.output_file_results);
        self.image_uri.apply_to(&mut job.image_uri);
        self.timestamp_updated_sec.apply_to(&mut job.timestamp_updated_sec);
        self.timestamp_starting_sec.apply_to(&mut job.timestamp_starting_sec);
        self.timestamp_started_sec.apply_to(&mut job.timestamp_started_sec);
        self.timestamp_finished_sec.apply_to(&mut job.timestamp_finished_sec);
    }

    /// JSON object holding only the set fields, keyed as in the job document
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        self.status.write_into("status", &mut doc);
        self.is_runnable.write_into("isRunnable", &mut doc);
        self.canceled.write_into("canceled", &mut doc);
        self.error.write_into("error", &mut doc);
        self.tags.write_into("tags", &mut doc);
        self.compute_client_id.write_into("computeClientId", &mut doc);
        self.compute_client_name.write_into("computeClientName", &mut doc);
        self.compute_client_user_id.write_into("computeClientUserId", &mut doc);
        self.output_file_url_list.write_into("outputFileUrlList", &mut doc);
        self.output_file_results.write_into("outputFileResults", &mut doc);
        self.image_uri.write_into("imageUri", &mut doc);
        self.timestamp_updated_sec.write_into("timestampUpdatedSec", &mut doc);
        self.timestamp_starting_sec.write_into("timestampStartingSec", &mut doc);
        self.timestamp_started_sec.write_into("timestampStartedSec", &mut doc);
        self.timestamp_finished_sec.write_into("timestampFinishedSec", &mut doc);
        Value::Object(doc)
    }
}

/// Mutable compute client fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputeClientPatch {
    pub compute_client_name: Patch<String>,
    pub description: Patch<String>,
    pub service_names: Patch<Vec<String>>,
    pub compute_slots: Patch<Vec<ComputeSlot>>,
    pub process_jobs_for_users: Patch<Option<Vec<String>>>,
    pub timestamp_last_active_sec: Patch<Option<f64>>,
}

impl ComputeClientPatch {
    pub fn apply(&self, client: &mut ComputeClient) {
        self.compute_client_name.apply_to(&mut client.compute_client_name);
        self.description.apply_to(&mut client.description);
        self.service_names.apply_to(&mut client.service_names);
        self.compute_slots.apply_to(&mut client.compute_slots);
        self.process_jobs_for_users.apply_to(&mut client.process_jobs_for_users);
        self.timestamp_last_active_sec.apply_to(&mut client.timestamp_last_active_sec);
    }

    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        self.compute_client_name.write_into("computeClientName", &mut doc);
        self.description.write_into("description", &mut doc);
        self.service_names.write_into("serviceNames", &mut doc);
        self.compute_slots.write_into("computeSlots", &mut doc);
        self.process_jobs_for_users.write_into("processJobsForUsers", &mut doc);
        self.timestamp_last_active_sec.write_into("timestampLastActiveSec", &mut doc);
        Value::Object(doc)
    }
}
