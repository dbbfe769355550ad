//! Persistence of key records
//!
//! [`KeyStore`] is the only way key material leaves the pipeline. A record is
//! addressed by its fingerprint id alone. Writing a record for an id that
//! already has one replaces it, even when the output mode differs.

mod fs;
mod memory;
mod record;

use std::path::PathBuf;

pub use fs::{write_atomic, FsKeyStore};
pub use memory::MemoryKeyStore;
pub use record::{record_file_name, KeyRecord};

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed key record {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode artifact {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("invalid fingerprint id {0:?}")]
    InvalidId(String),
    #[error("store lock poisoned: {0}")]
    Lock(String),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Storage backend for key records
///
/// Implementations are called from blocking worker threads and must be safe
/// to share between them.
pub trait KeyStore: Send + Sync + std::fmt::Debug {
    /// Publish a record atomically, replacing any previous record for the
    /// same id. Returns where the record was written.
    fn write(&self, record: &KeyRecord) -> Result<PathBuf, PersistenceError>;

    /// Read the record stored for `id`, if there is one. The record's
    /// [`KeyRecord::mode`] tells which output mode produced it.
    fn read(&self, id: &str) -> Result<Option<KeyRecord>, PersistenceError>;

    /// Ids with a stored record, sorted
    fn list(&self) -> Result<Vec<String>, PersistenceError>;
}

/// Reject ids that cannot safely become a file name
///
/// An id must be non-empty, must not start with `.`, and must not contain a
/// path separator, `..` or a NUL byte.
pub fn validate_id(id: &str) -> Result<(), PersistenceError> {
    let invalid = id.is_empty()
        || id.starts_with('.')
        || id.contains("..")
        || id.contains(['/', '\\', '\0']);
    if invalid {
        return Err(PersistenceError::InvalidId(id.to_string()));
    }
    Ok(())
}
