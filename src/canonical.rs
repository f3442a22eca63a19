//! Canonical serialization and graph fingerprints.
//!
//! ## Determinism Guarantees
//!
//! - Stable field order: struct fields serialize in declaration order
//! - Stable map order: every entity map in a collection is a `BTreeMap`
//! - Stable list order: node and connection lists keep insertion order
//! - Transient state (the graph event queue) is never serialized
//!
//! The same graph state therefore always yields the same fingerprint, and a
//! collection that survives a persistence round trip keeps its fingerprint.

use serde::Serialize;
use xxhash_rust::xxh64::xxh64;

use crate::graph::Collection;

/// Serialize a value to canonical JSON bytes for hashing.
pub fn to_canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(value)
}

/// Compute canonical hash of a serializable value.
pub fn canonical_hash<T: Serialize>(value: &T) -> Result<u64, serde_json::Error> {
    Ok(xxh64(&to_canonical_bytes(value)?, 0))
}

/// Compute canonical hash and return as hex string.
pub fn canonical_hash_hex<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    Ok(format!("{:016x}", canonical_hash(value)?))
}

/// Fingerprint of a collection's full graph state.
pub fn graph_fingerprint(collection: &Collection) -> Result<String, serde_json::Error> {
    canonical_hash_hex(collection)
}
