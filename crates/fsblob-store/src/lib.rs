//! Durable filesystem-backed blob containers.
//!
//! A blob container is a flat namespace of named byte strings. This crate
//! realises it on a local directory, one regular file per blob, with
//! crash-safe writes: a finished blob has had both its contents and its
//! directory entry fsynced, and renames are atomic and never replace an
//! existing blob.
//!
//! # Containers
//!
//! All containers implement the [`BlobContainer`] trait:
//!
//! - [`FsBlobContainer`] -- one directory on a local filesystem
//! - [`InMemoryBlobContainer`] -- map-based container for tests and embedding
//!
//! [`FsBlobStore`] maps hierarchical [`BlobPath`]s onto directories and hands
//! out configured [`FsBlobContainer`]s.
//!
//! # Example
//!
//! ```no_run
//! use fsblob_store::{BlobContainer, FsBlobStore};
//! use fsblob_types::BlobPath;
//!
//! let store = FsBlobStore::at_path("/var/lib/snapshots")?;
//! let container = store.container(&BlobPath::root().add("indices").add("0"))?;
//!
//! container.write_blob_atomic("snap-1", b"snapshot bytes")?;
//! assert_eq!(container.read_blob("snap-1")?, b"snapshot bytes");
//! # Ok::<(), fsblob_store::StoreError>(())
//! ```
//!
//! # Design Rules
//!
//! 1. `finish` on a writer is the only durability point: flush and close,
//!    fsync the file, fsync the directory, in that order.
//! 2. A move never replaces an existing target, and the directory is fsynced
//!    after the rename.
//! 3. Deletion is idempotent and not synced.
//! 4. Blob names are single path segments; anything else is rejected.
//! 5. All I/O errors are propagated, never retried or silently ignored.

pub mod config;
pub mod error;
pub mod fs;
pub mod memory;
pub mod store;
pub mod sync;
pub mod traits;
pub mod writer;

// Re-export primary types at crate root for ergonomic imports.
pub use config::{ConfigError, StoreConfig, DEFAULT_BUFFER_SIZE};
pub use error::{StoreError, StoreResult};
pub use fs::FsBlobContainer;
pub use fsblob_types::{BlobMetadata, BlobName, BlobPath};
pub use memory::InMemoryBlobContainer;
pub use store::FsBlobStore;
pub use sync::{OsSyncer, Syncer};
pub use traits::{BlobContainer, BlobOutput, PENDING_PREFIX};
pub use writer::DurableWriter;
