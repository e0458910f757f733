//! Capability redaction for outbound jobs
//!
//! A job carries two capabilities: its private key, which authorizes status
//! reports, and its secrets. What a reader may see depends on how they
//! authenticated. Handlers [`redact`] to the reader's level and the HTTP
//! boundary runs [`seal`] on every job it serializes; a job that still
//! exposes more than its level allows is an internal fault.

use crate::domain::job::Job;
use crate::error::CoreError;

/// How much of a job's capabilities a reader may see
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Disclosure {
    /// Neither private key nor secrets
    Public,
    /// Private key, no secrets
    PrivateKey,
}

/// Strip everything above `level`
pub fn redact(mut job: Job, level: Disclosure) -> Job {
    job.secrets = None;
    if level < Disclosure::PrivateKey {
        job.job_private_key = None;
    }
    job
}

/// Check that `job` exposes nothing above `level`
pub fn seal(job: &Job, level: Disclosure) -> Result<(), CoreError> {
    if job.secrets.is_some() {
        return Err(CoreError::InvariantViolation(format!(
            "job {} would be sent with its secrets",
            job.job_id
        )));
    }
    if level < Disclosure::PrivateKey && job.job_private_key.is_some() {
        return Err(CoreError::InvariantViolation(format!(
            "job {} would be sent with its private key",
            job.job_id
        )));
    }
    Ok(())
}
