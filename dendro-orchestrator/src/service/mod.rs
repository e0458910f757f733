//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services orchestrate between repositories and contain domain logic.

pub mod admission;
pub mod compute_client;
pub mod dependency;
pub mod error;
pub mod identity;
pub mod job;
pub mod notifier;
pub mod pubsub;

// Re-export for convenience
pub use admission as admission_service;
pub use compute_client as compute_client_service;
pub use dependency as dependency_service;
pub use error::ServiceError;
pub use job as job_service;
pub use pubsub as pubsub_service;
