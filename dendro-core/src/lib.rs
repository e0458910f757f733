//! Dendro Core
//!
//! Core types and algorithms for the Dendro job broker.
//!
//! This crate contains:
//! - Domain types: Jobs, compute clients and services
//! - DTOs: Request/response bodies shared by the orchestrator, client and runner
//! - Scheduling logic: definition hashing, dependency evaluation, the job
//!   state machine and slot-based admission
//!
//! Nothing in here performs I/O. Persistence lives in the orchestrator,
//! execution lives in the runner.

pub mod admission;
pub mod canonical;
pub mod clock;
pub mod dependency;
pub mod domain;
pub mod dto;
pub mod error;
pub mod event;
pub mod ids;
pub mod patch;
pub mod secrets;
pub mod transition;

#[cfg(test)]
mod testing;

pub use error::CoreError;
