use thiserror::Error;

use crate::disk::DiskError;

/// File system error type
#[derive(Debug, Error)]
pub enum FileSystemError {
    #[error("disk I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no space left: {0} exhausted")]
    NoSpace(&'static str),

    #[error("no such file or directory: {0}")]
    NotFound(String),

    #[error("file or directory already exists: {0}")]
    AlreadyExists(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("directory not empty: {0}")]
    NotEmpty(String),

    #[error("invalid file system size: {0} blocks")]
    InvalidSize(u64),

    #[error("too many levels of symbolic links: {0}")]
    TooManySymlinks(String),

    #[error("out of range: {0}")]
    OutOfRange(String),

    #[error("invalid file handle: {0}")]
    InvalidHandle(u64),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("file name too long: {0}")]
    NameTooLong(String),

    #[error("file too large: {0} bytes")]
    FileTooLarge(u64),

    #[error("file system corrupted: {0}")]
    Corrupted(String),
}

impl From<DiskError> for FileSystemError {
    fn from(e: DiskError) -> Self {
        match e {
            DiskError::OutOfRange { block, capacity } => {
                Self::OutOfRange(format!("block {} (capacity {})", block, capacity))
            }
            DiskError::Io(e) => Self::Io(e),
        }
    }
}

impl From<bincode::Error> for FileSystemError {
    fn from(e: bincode::Error) -> Self {
        Self::Corrupted(e.to_string())
    }
}

/// File system result type
pub type Result<T> = std::result::Result<T, FileSystemError>;
