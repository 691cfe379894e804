//! Crate-wide error taxonomy.
//!
//! Boundary errors (`InvalidInput`, `NotFound`, `Conflict`, `AlreadyRunning`)
//! are reported to the caller without side effects. `Adapter` and
//! `Persistence` failures during a training run abort the run and leave the
//! previously committed index untouched.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Wrong file type, malformed PDF, or an empty training set.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown filename.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate filename on upload.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A training run is already in progress; the new request was rejected.
    #[error("training already running")]
    AlreadyRunning,

    /// Extraction or embedding service failure.
    #[error("adapter failure: {0}")]
    Adapter(String),

    /// Index load/save or file I/O failure.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Persistence(e.to_string())
    }
}
