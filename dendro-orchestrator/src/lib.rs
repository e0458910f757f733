//! Dendro orchestrator
//!
//! Job broker between users submitting processing jobs and the compute
//! clients that run them.

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;
pub mod state;

pub use state::AppState;
