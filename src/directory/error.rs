use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error opening a file for reading.
#[derive(Debug, Error)]
pub enum OpenReadError {
    #[error("file does not exist: '{0}'")]
    FileDoesNotExist(PathBuf),
    #[error("io error while opening '{filepath}': {io_error}")]
    IoError { io_error: Arc<io::Error>, filepath: PathBuf },
}

impl OpenReadError {
    pub fn wrap_io_error(io_error: io::Error, filepath: PathBuf) -> Self {
        OpenReadError::IoError { io_error: Arc::new(io_error), filepath }
    }
}

/// Error opening a file for writing.
#[derive(Debug, Error)]
pub enum OpenWriteError {
    #[error("file already exists: '{0}'")]
    FileAlreadyExists(PathBuf),
    #[error("io error while opening '{filepath}' for write: {io_error}")]
    IoError { io_error: Arc<io::Error>, filepath: PathBuf },
}

impl OpenWriteError {
    pub fn wrap_io_error(io_error: io::Error, filepath: PathBuf) -> Self {
        OpenWriteError::IoError { io_error: Arc::new(io_error), filepath }
    }
}

/// Error deleting a file.
#[derive(Debug, Error)]
pub enum DeleteError {
    #[error("file does not exist: '{0}'")]
    FileDoesNotExist(PathBuf),
    #[error("io error while deleting '{filepath}': {io_error}")]
    IoError { io_error: Arc<io::Error>, filepath: PathBuf },
}

impl DeleteError {
    pub fn wrap_io_error(io_error: io::Error, filepath: PathBuf) -> Self {
        DeleteError::IoError { io_error: Arc::new(io_error), filepath }
    }
}

use std::sync::Arc;

impl From<OpenReadError> for crate::common::errors::SearchError {
    fn from(err: OpenReadError) -> Self {
        match err {
            OpenReadError::FileDoesNotExist(p) => {
                crate::common::errors::SearchError::Corruption(format!("missing file {p:?}"))
            }
            OpenReadError::IoError { io_error, filepath } => crate::common::errors::SearchError::Io(
                io::Error::new(io_error.kind(), format!("{filepath:?}: {io_error}")),
            ),
        }
    }
}

impl From<OpenWriteError> for crate::common::errors::SearchError {
    fn from(err: OpenWriteError) -> Self {
        match err {
            OpenWriteError::FileAlreadyExists(_) => crate::common::errors::SearchError::IndexLocked,
            OpenWriteError::IoError { io_error, filepath } => crate::common::errors::SearchError::Io(
                io::Error::new(io_error.kind(), format!("{filepath:?}: {io_error}")),
            ),
        }
    }
}

impl From<DeleteError> for crate::common::errors::SearchError {
    fn from(err: DeleteError) -> Self {
        match err {
            DeleteError::FileDoesNotExist(p) => {
                crate::common::errors::SearchError::Corruption(format!("missing file {p:?}"))
            }
            DeleteError::IoError { io_error, filepath } => crate::common::errors::SearchError::Io(
                io::Error::new(io_error.kind(), format!("{filepath:?}: {io_error}")),
            ),
        }
    }
}
