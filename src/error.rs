use std::path::PathBuf;

use thiserror::Error;

/// Failures at the few seams that can actually fail.
///
/// Engine operations never produce these: a missing element or a malformed
/// persisted value degrades to an inert feature instead.
#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("invalid theme config: {0}")]
    InvalidConfig(#[from] serde_json::Error),

    #[error("storage write to {path:?} failed: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage directory {path:?} could not be created: {source}")]
    StorageDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T, E = ThemeError> = std::result::Result<T, E>;
