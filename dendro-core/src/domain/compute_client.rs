//! Compute client domain types

use serde::{Deserialize, Serialize};

use super::job::RequiredResources;

/// A registered worker that pulls jobs for one or more services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeClient {
    pub compute_client_id: String,
    pub compute_client_private_key: Option<String>,
    pub compute_client_name: String,
    #[serde(default)]
    pub description: String,
    pub user_id: String,
    /// Earlier services take priority during admission
    #[serde(default)]
    pub service_names: Vec<String>,
    #[serde(default)]
    pub compute_slots: Vec<ComputeSlot>,
    pub process_jobs_for_users: Option<Vec<String>>,
    pub timestamp_created_sec: f64,
    pub timestamp_last_active_sec: Option<f64>,
}

/// Resource envelope of one kind of job a compute client can run,
/// and how many such jobs may run at once
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeSlot {
    pub num_cpus_min: u32,
    pub num_cpus_max: u32,
    pub num_gpus_min: u32,
    pub num_gpus_max: u32,
    pub memory_gb_min: f64,
    pub memory_gb_max: f64,
    pub time_sec_min: f64,
    pub time_sec_max: f64,
    #[serde(default = "default_multiplicity")]
    pub multiplicity: u32,
}

fn default_multiplicity() -> u32 {
    1
}

impl ComputeSlot {
    /// Every dimension of `resources` lies within this slot's bounds
    pub fn fits(&self, resources: &RequiredResources) -> bool {
        (self.num_cpus_min..=self.num_cpus_max).contains(&resources.num_cpus)
            && (self.num_gpus_min..=self.num_gpus_max).contains(&resources.num_gpus)
            && resources.memory_gb >= self.memory_gb_min
            && resources.memory_gb <= self.memory_gb_max
            && resources.time_sec >= self.time_sec_min
            && resources.time_sec <= self.time_sec_max
    }

    /// Concurrent occupants allowed; zero is read as one
    pub fn capacity(&self) -> u32 {
        self.multiplicity.max(1)
    }

    /// Bounds are ordered and finite
    pub fn is_well_formed(&self) -> bool {
        let floats = [self.memory_gb_min, self.memory_gb_max, self.time_sec_min, self.time_sec_max];
        floats.iter().all(|v| v.is_finite() && *v >= 0.0)
            && self.num_cpus_min <= self.num_cpus_max
            && self.num_gpus_min <= self.num_gpus_max
            && self.memory_gb_min <= self.memory_gb_max
            && self.time_sec_min <= self.time_sec_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(multiplicity: u32) -> ComputeSlot {
        ComputeSlot {
            num_cpus_min: 1,
            num_cpus_max: 4,
            num_gpus_min: 0,
            num_gpus_max: 0,
            memory_gb_min: 0.0,
            memory_gb_max: 8.0,
            time_sec_min: 0.0,
            time_sec_max: 3600.0,
            multiplicity,
        }
    }

    fn resources(num_cpus: u32, num_gpus: u32, memory_gb: f64) -> RequiredResources {
        RequiredResources {
            num_cpus,
            num_gpus,
            memory_gb,
            time_sec: 60.0,
        }
    }

    #[test]
    fn test_fits_inclusive_bounds() {
        let slot = slot(1);
        assert!(slot.fits(&resources(1, 0, 0.0)));
        assert!(slot.fits(&resources(4, 0, 8.0)));
        assert!(!slot.fits(&resources(5, 0, 1.0)));
        assert!(!slot.fits(&resources(0, 0, 1.0)));
        assert!(!slot.fits(&resources(2, 1, 1.0)));
        assert!(!slot.fits(&resources(2, 0, 8.5)));
    }

    #[test]
    fn test_zero_multiplicity_counts_as_one() {
        assert_eq!(slot(0).capacity(), 1);
        assert_eq!(slot(3).capacity(), 3);
    }

    #[test]
    fn test_missing_multiplicity_defaults_to_one() {
        let parsed: ComputeSlot = serde_json::from_value(serde_json::json!({
            "numCpusMin": 1, "numCpusMax": 2,
            "numGpusMin": 0, "numGpusMax": 0,
            "memoryGbMin": 0, "memoryGbMax": 4,
            "timeSecMin": 0, "timeSecMax": 100
        }))
        .unwrap();
        assert_eq!(parsed.multiplicity, 1);
    }

    #[test]
    fn test_inverted_bounds_are_rejected() {
        let mut bad = slot(1);
        bad.num_cpus_min = 8;
        assert!(!bad.is_well_formed());
        assert!(slot(1).is_well_formed());
    }
}
