//! Collection storage backends.
//!
//! Stores hold opaque collection blobs (see [`codec`]) under string keys.

pub mod codec;
pub mod file;
pub mod memory;

pub use codec::{BlobInfo, CodecError, SCHEMA_VERSION};
pub use file::FileCollectionStore;
pub use memory::InMemoryCollectionStore;

/// Errors raised by storage backends.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No blob is stored under the key.
    #[error("No collection stored under key '{0}'")]
    NotFound(String),

    /// Key cannot be used by this backend.
    #[error("Invalid store key '{0}'")]
    InvalidKey(String),

    /// Underlying I/O failure.
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for collection storage backends.
///
/// Implementations must return keys in a deterministic (sorted) order.
pub trait CollectionStore: Send + Sync {
    /// Fetch the blob stored under `key`.
    fn load(&self, key: &str) -> Result<Vec<u8>, StoreError>;

    /// Store a blob under `key`, replacing any previous one.
    fn save(&self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// All stored keys, sorted.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}
