use std::collections::BTreeMap;
use std::io::{self, Cursor, Read, Write};
use std::sync::{Arc, RwLock};

use fsblob_types::{validate_blob_name, BlobMetadata, BlobPath};

use crate::error::{StoreError, StoreResult};
use crate::traits::{BlobContainer, BlobOutput};

type Blobs = Arc<RwLock<BTreeMap<String, Vec<u8>>>>;

/// In-memory, map-based blob container.
///
/// Intended for tests and embedding. Blobs are held behind a `RwLock`;
/// readers get a copy, writers publish their contents on `finish`.
pub struct InMemoryBlobContainer {
    path: BlobPath,
    blobs: Blobs,
}

impl InMemoryBlobContainer {
    /// Create a new empty container.
    pub fn new(path: BlobPath) -> Self {
        Self {
            path,
            blobs: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the container is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored blobs.
    pub fn total_bytes(&self) -> u64 {
        self.blobs
            .read()
            .expect("lock poisoned")
            .values()
            .map(|data| data.len() as u64)
            .sum()
    }

    /// Remove all blobs.
    pub fn clear(&self) {
        self.blobs.write().expect("lock poisoned").clear();
    }
}

impl Default for InMemoryBlobContainer {
    fn default() -> Self {
        Self::new(BlobPath::root())
    }
}

impl BlobContainer for InMemoryBlobContainer {
    fn path(&self) -> &BlobPath {
        &self.path
    }

    fn list_blobs(&self) -> StoreResult<BTreeMap<String, BlobMetadata>> {
        let map = self.blobs.read().expect("lock poisoned");
        Ok(map
            .iter()
            .map(|(name, data)| (name.clone(), BlobMetadata::new(name.clone(), data.len() as u64)))
            .collect())
    }

    fn blob_exists(&self, name: &str) -> StoreResult<bool> {
        validate_blob_name(name)?;
        Ok(self.blobs.read().expect("lock poisoned").contains_key(name))
    }

    fn open_input(&self, name: &str) -> StoreResult<Box<dyn Read + Send>> {
        validate_blob_name(name)?;
        let map = self.blobs.read().expect("lock poisoned");
        let data = map
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(data)))
    }

    fn create_output(&self, name: &str) -> StoreResult<Box<dyn BlobOutput>> {
        validate_blob_name(name)?;
        // Visible (empty) while open, like a freshly created file.
        self.blobs
            .write()
            .expect("lock poisoned")
            .insert(name.to_string(), Vec::new());
        Ok(Box::new(MemoryOutput {
            name: name.to_string(),
            buffer: Vec::new(),
            blobs: self.blobs.clone(),
        }))
    }

    fn delete_blob(&self, name: &str) -> StoreResult<()> {
        validate_blob_name(name)?;
        self.blobs.write().expect("lock poisoned").remove(name);
        Ok(())
    }

    fn move_blob(&self, source: &str, target: &str) -> StoreResult<()> {
        validate_blob_name(source)?;
        validate_blob_name(target)?;
        let mut map = self.blobs.write().expect("lock poisoned");
        if map.contains_key(target) {
            return Err(StoreError::AlreadyExists(target.to_string()));
        }
        let data = map
            .remove(source)
            .ok_or_else(|| StoreError::NotFound(source.to_string()))?;
        map.insert(target.to_string(), data);
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryBlobContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobContainer")
            .field("path", &self.path)
            .field("blob_count", &self.len())
            .finish()
    }
}

struct MemoryOutput {
    name: String,
    buffer: Vec<u8>,
    blobs: Blobs,
}

impl Write for MemoryOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl BlobOutput for MemoryOutput {
    fn finish(self: Box<Self>) -> StoreResult<u64> {
        let MemoryOutput { name, buffer, blobs } = *self;
        let len = buffer.len() as u64;
        blobs.write().expect("lock poisoned").insert(name, buffer);
        Ok(len)
    }
}
