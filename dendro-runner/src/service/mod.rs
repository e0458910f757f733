//! Service layer
//!
//! Job execution and the cancellation watch that runs beside it.
//!
//! Execution is trait-based so the scheduler can be tested without
//! spawning processes.

mod cancel_watch;
mod execution;

pub use cancel_watch::spawn_cancel_watch;
pub use execution::{ExecutionOutcome, ExecutionService, ProcessExecutionService};
