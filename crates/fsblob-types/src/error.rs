use thiserror::Error;

/// Errors produced by type construction and validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid blob name {name:?}: {reason}")]
    InvalidBlobName { name: String, reason: String },

    #[error("invalid path segment {segment:?}: {reason}")]
    InvalidPathSegment { segment: String, reason: String },
}
