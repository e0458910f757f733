//! Job definition canonicalization
//!
//! Two definitions that differ only in the order of their input files,
//! output files or parameters describe the same work and must hash the same.
//! Each of those lists is sorted by name, the result is serialized with
//! RFC 8785 canonical JSON and digested with SHA-256.

use sha2::{Digest, Sha256};

use crate::domain::job::JobDefinition;
use crate::error::CoreError;

/// Copy of `definition` with its named lists in byte order of their names
pub fn normalize(definition: &JobDefinition) -> JobDefinition {
    let mut normalized = definition.clone();
    normalized.input_files.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    normalized.output_files.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    normalized.parameters.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
    normalized
}

/// Canonical byte serialization of a definition
pub fn canonical_bytes(definition: &JobDefinition) -> Result<Vec<u8>, CoreError> {
    serde_json_canonicalizer::to_vec(&normalize(definition))
        .map_err(|e| CoreError::Canonicalization(e.to_string()))
}

/// Lowercase hex SHA-256 of the canonical serialization
pub fn job_definition_hash(definition: &JobDefinition) -> Result<String, CoreError> {
    let bytes = canonical_bytes(definition)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
