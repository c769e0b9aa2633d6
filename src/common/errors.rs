use std::io;

use thiserror::Error;

use crate::common::file_operations::FileOperationError;

/// Top level error type for every fallible operation this crate exposes.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("file operation error: {0}")]
    FileOperation(#[from] FileOperationError),

    #[error("data corruption: {0}")]
    Corruption(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("index is closed")]
    Closed,

    #[error("index is locked by another writer")]
    IndexLocked,

    #[error("internal error: {0}")]
    SystemError(String),

    #[error("a background thread panicked: {0}")]
    ErrorInThread(String),

    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

impl Clone for SearchError {
    fn clone(&self) -> Self {
        // `io::Error` and friends are not `Clone`; fall back to their
        // display form, which is all callers that need to fan this error
        // out to several waiters (e.g. `FutureResult`) actually need.
        match self {
            SearchError::Io(e) => SearchError::SystemError(format!("io error: {e}")),
            SearchError::FileOperation(e) => SearchError::SystemError(format!("{e}")),
            SearchError::Corruption(s) => SearchError::Corruption(s.clone()),
            SearchError::Cancelled => SearchError::Cancelled,
            SearchError::InvalidQuery(s) => SearchError::InvalidQuery(s.clone()),
            SearchError::InvalidConfig(s) => SearchError::InvalidConfig(s.clone()),
            SearchError::Closed => SearchError::Closed,
            SearchError::IndexLocked => SearchError::IndexLocked,
            SearchError::SystemError(s) => SearchError::SystemError(s.clone()),
            SearchError::ErrorInThread(s) => SearchError::ErrorInThread(s.clone()),
            SearchError::Poisoned(s) => SearchError::Poisoned(s.clone()),
        }
    }
}
