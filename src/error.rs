use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a [`StorageBackend`](crate::storage::StorageBackend)
/// operation.
///
/// The [`Storage`](crate::Storage) gateway logs and swallows these; they only
/// reach callers that use a backend directly.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage is unavailable")]
    Unavailable,

    #[error("storage quota exceeded writing {key:?} ({size} bytes)")]
    QuotaExceeded { key: String, size: usize },

    #[error("invalid storage key {0:?}")]
    InvalidKey(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode value for {key:?}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode value for {key:?}: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of a [`RemoteSource`](crate::RemoteSource) call.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("asset {path} could not be read: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("asset {path} is not a valid record list: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("remote rejected the request: {0}")]
    Rejected(String),
}
