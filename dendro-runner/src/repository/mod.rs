//! Repository layer
//!
//! Thin, trait-based wrappers over the orchestrator client so the
//! scheduler can be exercised without a server.

mod jobs;

pub use jobs::{HttpJobRepository, JobRepository};
