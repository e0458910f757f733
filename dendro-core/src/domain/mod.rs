//! Core domain types
//!
//! This module contains the entities the broker persists and exchanges:
//! jobs, compute clients and services. They are shared between the
//! orchestrator (for persistence) and compute clients (for execution).
//! Field names travel as camelCase on the wire.

pub mod compute_client;
pub mod job;
pub mod service;
