//! Foundation types for fsblob.
//!
//! This crate provides the small value types shared by every fsblob crate.
//! None of them touch the filesystem.
//!
//! # Key Types
//!
//! - [`BlobPath`] — Hierarchical location of a container inside a repository
//! - [`BlobName`] — Validated single-segment blob name
//! - [`BlobMetadata`] — Name and byte length of a stored blob

pub mod error;
pub mod metadata;
pub mod name;
pub mod path;

pub use error::TypeError;
pub use metadata::BlobMetadata;
pub use name::{validate_blob_name, BlobName};
pub use path::BlobPath;
