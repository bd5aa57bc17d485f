use std::path::PathBuf;

use thiserror::Error;

use crate::storage::StorageError;

/// Fatal pipeline errors.
///
/// Either inventory being unavailable aborts the pipeline before any
/// remote mutation; per-object failures are handled inline instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("could not read local directory {path}: {source}")]
    LocalList {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("could not list bucket '{bucket}': {source}")]
    RemoteList {
        bucket: String,
        source: StorageError,
    },
}

/// Why a single object failed to sync. Logged and counted, never fatal.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("could not read {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StorageError),
}
