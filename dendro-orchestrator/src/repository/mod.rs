//! Repository Module
//!
//! Data access layer for the orchestrator. Each store is a trait so the
//! services run unchanged against Postgres or the in-memory backend.

pub mod compute_client;
pub mod job;
pub mod memory;
pub mod service;
pub mod user;

use thiserror::Error;

pub use compute_client::{ComputeClientStore, PgComputeClientStore};
pub use job::{JobStore, PgJobStore, RunnableQuery};
pub use service::{PgServiceDirectory, ServiceDirectory};
pub use user::{IdentityResolver, PgIdentityResolver};

/// Persistence failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Malformed document: {0}")]
    Document(#[from] serde_json::Error),
}
