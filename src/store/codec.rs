//! Blob encoding of whole collections.
//!
//! A blob is a JSON envelope:
//!
//! ```text
//! { schema_version, exported_at, fingerprint, collection }
//! ```
//!
//! Decoding rejects unknown schema versions and blobs whose stored
//! fingerprint does not match the decoded graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canonical::graph_fingerprint;
use crate::graph::{Collection, GraphError};

/// Version of the blob layout written by this crate.
pub const SCHEMA_VERSION: u32 = 1;

/// Errors encoding or decoding a collection blob.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding or decoding failed.
    #[error("Blob serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Blob was written with an unsupported layout.
    #[error("Unsupported schema version {found} (expected {expected})")]
    SchemaMismatch {
        /// Version found in the blob.
        found: u32,
        /// Version this crate reads.
        expected: u32,
    },

    /// Stored fingerprint does not match the decoded graph.
    #[error("Fingerprint mismatch: blob says {stored}, graph hashes to {computed}")]
    FingerprintMismatch {
        /// Fingerprint recorded in the blob.
        stored: String,
        /// Fingerprint of the decoded collection.
        computed: String,
    },

    /// Decoded graph breaks a model invariant.
    #[error("Invalid collection: {0}")]
    Invalid(#[from] GraphError),
}

/// Envelope metadata of a decoded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    /// Layout version.
    pub schema_version: u32,
    /// When the blob was written.
    pub exported_at: DateTime<Utc>,
    /// Graph fingerprint at export time.
    pub fingerprint: String,
}

#[derive(Serialize)]
struct EnvelopeOut<'a> {
    schema_version: u32,
    exported_at: DateTime<Utc>,
    fingerprint: String,
    collection: &'a Collection,
}

// Not flattened: integer map keys must reach serde_json directly.
#[derive(Deserialize)]
struct EnvelopeIn {
    schema_version: u32,
    exported_at: DateTime<Utc>,
    fingerprint: String,
    collection: Collection,
}

impl Collection {
    /// Encode this collection as an opaque blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let envelope = EnvelopeOut {
            schema_version: SCHEMA_VERSION,
            exported_at: Utc::now(),
            fingerprint: graph_fingerprint(self)?,
            collection: self,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Decode a blob produced by [`Collection::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Self::from_bytes_with_info(bytes).map(|(collection, _)| collection)
    }

    /// Decode a blob and return its envelope metadata alongside.
    pub fn from_bytes_with_info(bytes: &[u8]) -> Result<(Self, BlobInfo), CodecError> {
        let envelope: EnvelopeIn = serde_json::from_slice(bytes)?;
        if envelope.schema_version != SCHEMA_VERSION {
            return Err(CodecError::SchemaMismatch {
                found: envelope.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        let computed = graph_fingerprint(&envelope.collection)?;
        if computed != envelope.fingerprint {
            tracing::warn!(stored = %envelope.fingerprint, %computed, "Rejected blob with stale fingerprint");
            return Err(CodecError::FingerprintMismatch {
                stored: envelope.fingerprint,
                computed,
            });
        }
        envelope.collection.validate_connections()?;
        let info = BlobInfo {
            schema_version: envelope.schema_version,
            exported_at: envelope.exported_at,
            fingerprint: envelope.fingerprint,
        };
        Ok((envelope.collection, info))
    }
}
