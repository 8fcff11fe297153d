use std::collections::BTreeMap;
use std::io::{Read, Write};

use fsblob_types::{BlobMetadata, BlobPath};
use tracing::warn;

use crate::error::{StoreError, StoreResult};

/// Prefix for the temporary names used by [`BlobContainer::write_blob_atomic`].
pub const PENDING_PREFIX: &str = "pending-";

/// A blob output stream whose contents are committed by [`finish`](Self::finish).
///
/// Dropping an output without finishing it promises nothing about what
/// survives a crash.
pub trait BlobOutput: Write + Send {
    /// Flush, close and make the blob durable. Returns the bytes written.
    fn finish(self: Box<Self>) -> StoreResult<u64>;
}

/// A flat namespace of named blobs.
///
/// All implementations must satisfy these invariants:
/// - Names are single path segments; anything else fails with `InvalidName`.
/// - `delete_blob` is idempotent and never reports `NotFound`.
/// - `move_blob` never replaces an existing target.
/// - A blob written through `create_output` is only guaranteed complete once
///   `finish` has returned `Ok`.
/// - No operation retries internally; errors surface to the caller and any
///   partial effects are left for the caller to clean up.
pub trait BlobContainer: Send + Sync {
    /// Logical location of this container in the repository.
    fn path(&self) -> &BlobPath;

    /// All blobs currently stored, keyed by name.
    fn list_blobs(&self) -> StoreResult<BTreeMap<String, BlobMetadata>>;

    /// Whether anything exists under `name`.
    fn blob_exists(&self, name: &str) -> StoreResult<bool>;

    /// Open a buffered reader over the blob.
    fn open_input(&self, name: &str) -> StoreResult<Box<dyn Read + Send>>;

    /// Open a buffered writer that creates or overwrites the blob.
    fn create_output(&self, name: &str) -> StoreResult<Box<dyn BlobOutput>>;

    /// Remove the blob if present.
    fn delete_blob(&self, name: &str) -> StoreResult<()>;

    /// Atomically rename `source` to `target`. Fails if `target` exists.
    fn move_blob(&self, source: &str, target: &str) -> StoreResult<()>;

    /// Write `data` as the complete contents of `name`.
    fn write_blob(&self, name: &str, data: &[u8]) -> StoreResult<u64> {
        let mut output = self.create_output(name)?;
        output.write_all(data)?;
        output.finish()
    }

    /// Read the complete contents of `name`.
    fn read_blob(&self, name: &str) -> StoreResult<Vec<u8>> {
        let mut input = self.open_input(name)?;
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Stage `data` under a temporary name, then move it to `name`.
    ///
    /// Either `name` ends up holding all of `data` or it is left untouched.
    /// Fails with `AlreadyExists` if `name` is taken.
    fn write_blob_atomic(&self, name: &str, data: &[u8]) -> StoreResult<u64> {
        fsblob_types::validate_blob_name(name)?;
        if self.blob_exists(name)? {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }

        let pending = format!("{PENDING_PREFIX}{}", uuid::Uuid::now_v7());
        let result = self
            .write_blob(&pending, data)
            .and_then(|len| self.move_blob(&pending, name).map(|()| len));

        match &result {
            // Nothing to clean up; a read-only container staged nothing.
            Ok(_) | Err(StoreError::ReadOnly) => {}
            Err(_) => {
                if let Err(e) = self.delete_blob(&pending) {
                    warn!(blob = %pending, error = %e, "failed to clean up pending blob");
                }
            }
        }
        result
    }

    /// Delete each blob in turn, stopping at the first error.
    fn delete_blobs(&self, names: &[&str]) -> StoreResult<()> {
        names.iter().try_for_each(|name| self.delete_blob(name))
    }

    /// Blobs whose names start with `prefix`.
    fn list_blobs_by_prefix(&self, prefix: &str) -> StoreResult<BTreeMap<String, BlobMetadata>> {
        let mut blobs = self.list_blobs()?;
        blobs.retain(|name, _| name.starts_with(prefix));
        Ok(blobs)
    }
}
