//! Slot-based admission of pending jobs onto a compute client
//!
//! The orchestrator gathers candidates in service priority order; this
//! module decides which of them the client can take right now given the
//! jobs it is already running.

use std::cmp::Ordering;

use rand::Rng;
use rand::seq::SliceRandom;

use crate::domain::compute_client::{ComputeClient, ComputeSlot};
use crate::domain::job::{Job, RequiredResources};

/// Per-slot occupancy for one compute client
#[derive(Debug, Clone)]
pub struct SlotLedger<'a> {
    slots: &'a [ComputeSlot],
    occupied: Vec<u32>,
}

impl<'a> SlotLedger<'a> {
    pub fn new(slots: &'a [ComputeSlot]) -> Self {
        Self {
            slots,
            occupied: vec![0; slots.len()],
        }
    }

    /// Ledger with every running job placed in the first fitting slot that
    /// still has room. Running jobs that fit nowhere are not counted.
    pub fn seeded(slots: &'a [ComputeSlot], running: &[Job]) -> Self {
        let mut ledger = Self::new(slots);
        for job in running {
            ledger.try_occupy(&job.required_resources);
        }
        ledger
    }

    /// Take room in the first fitting slot, returning its index
    pub fn try_occupy(&mut self, resources: &RequiredResources) -> Option<usize> {
        let index = self
            .slots
            .iter()
            .zip(&self.occupied)
            .position(|(slot, used)| *used < slot.capacity() && slot.fits(resources))?;
        self.occupied[index] += 1;
        Some(index)
    }

    pub fn occupancy(&self) -> &[u32] {
        &self.occupied
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AdmissionOptions {
    /// Stop after the first admitted job
    pub single_job: bool,
    /// A specific job was requested; skip slot accounting
    pub bypass_capacity: bool,
}

/// Select the candidates `client` may take, in candidate order
///
/// Candidates targeted away from the client are dropped. Nothing is
/// mutated; the caller claims admitted jobs through the state machine.
pub fn admit(
    client: &ComputeClient,
    running: &[Job],
    candidates: Vec<Job>,
    options: AdmissionOptions,
) -> Vec<Job> {
    let mut ledger = SlotLedger::seeded(&client.compute_slots, running);
    let mut admitted = Vec::new();

    for job in candidates {
        if !job.is_targeted_at(&client.compute_client_id) {
            continue;
        }
        if !options.bypass_capacity && ledger.try_occupy(&job.required_resources).is_none() {
            continue;
        }
        admitted.push(job);
        if options.single_job {
            break;
        }
    }

    admitted
}

/// Newest first
pub fn order_newest_first(jobs: &mut [Job]) {
    jobs.sort_by(|a, b| {
        b.timestamp_created_sec
            .partial_cmp(&a.timestamp_created_sec)
            .unwrap_or(Ordering::Equal)
    });
}

/// Uniform random sample of at most `size` jobs, in random order
pub fn random_sample<R: Rng + ?Sized>(mut jobs: Vec<Job>, size: usize, rng: &mut R) -> Vec<Job> {
    jobs.shuffle(rng);
    jobs.truncate(size);
    jobs
}
