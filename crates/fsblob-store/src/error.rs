use std::io;
use std::path::PathBuf;

use fsblob_types::TypeError;

use crate::config::ConfigError;

/// Errors from blob container and store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested blob does not exist.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// A move target already names a blob.
    #[error("blob already exists: {0}")]
    AlreadyExists(String),

    /// The blob name is not a single safe path segment.
    #[error("invalid blob name: {0}")]
    InvalidName(#[from] TypeError),

    /// I/O error from the underlying filesystem, including failed fsyncs.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The platform or filesystem cannot fsync this directory.
    #[error("directory fsync unsupported for {}", .0.display())]
    DirSyncUnsupported(PathBuf),

    /// Store configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Container or store was opened read-only.
    #[error("container is read-only")]
    ReadOnly,
}

impl StoreError {
    /// Map an I/O error about `name`, promoting `NotFound` to the typed variant.
    pub(crate) fn from_io(name: &str, err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(name.to_string()),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(name.to_string()),
            _ => Self::Io(err),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
