//! Data Transfer Objects for the HTTP API
//!
//! Request bodies deserialize into these types and are then validated into
//! typed values before any handler logic runs. Response bodies are shared
//! with the client crate so both sides agree on the wire format.

use serde::{Deserialize, Deserializer, Serialize};

pub mod compute_client;
pub mod job;

/// Plain acknowledgement body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true }
    }
}

/// Distinguishes an absent field from an explicit `null` when used with
/// `#[serde(default, deserialize_with = "present")]` on an `Option<Option<T>>`
pub(crate) fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
