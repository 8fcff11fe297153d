//! FsBlobStore: maps hierarchical blob paths onto directories.
//!
//! The store owns configuration only. Each container it hands out receives
//! its directory, buffer size, read-only flag and sync layer by value and
//! never refers back to the store.
//!
//! Layout:
//! ```text
//! {root}/
//! └── indices/          # BlobPath ["indices"]
//!     └── 0/            # BlobPath ["indices", "0"]
//!         ├── meta-1
//!         └── snap-1
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fsblob_types::BlobPath;
use tracing::debug;

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::fs::FsBlobContainer;
use crate::sync::{OsSyncer, Syncer};

/// Filesystem blob store, the factory for [`FsBlobContainer`]s.
#[derive(Clone, Debug)]
pub struct FsBlobStore {
    config: StoreConfig,
    syncer: Arc<dyn Syncer>,
}

impl FsBlobStore {
    /// Open a store, creating its root directory unless read-only.
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;

        if !config.read_only {
            fs::create_dir_all(&config.root)?;
        }

        debug!(root = %config.root.display(), read_only = config.read_only, "opened blob store");
        Ok(Self {
            config,
            syncer: Arc::new(OsSyncer),
        })
    }

    /// Open a writable store at `root` with default settings.
    pub fn at_path(root: impl Into<PathBuf>) -> StoreResult<Self> {
        Self::new(StoreConfig::with_root(root))
    }

    /// Replace the sync layer used by every container created afterwards.
    pub fn with_syncer(mut self, syncer: Arc<dyn Syncer>) -> Self {
        self.syncer = syncer;
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn buffer_size_bytes(&self) -> usize {
        self.config.buffer_size_bytes
    }

    /// The directory a container path maps to.
    pub fn container_dir(&self, path: &BlobPath) -> StoreResult<PathBuf> {
        path.check_segments()?;
        Ok(path
            .segments()
            .iter()
            .fold(self.config.root.clone(), |dir, segment| dir.join(segment)))
    }

    /// Get the container at `path`, creating its directory unless read-only.
    pub fn container(&self, path: &BlobPath) -> StoreResult<FsBlobContainer> {
        let dir = self.container_dir(path)?;

        if self.config.read_only {
            if !dir.is_dir() {
                return Err(StoreError::NotFound(path.to_string()));
            }
        } else {
            fs::create_dir_all(&dir)?;
        }

        Ok(FsBlobContainer::new(path.clone(), dir, self.config.buffer_size_bytes)
            .read_only(self.config.read_only)
            .with_syncer(self.syncer.clone()))
    }

    /// Remove the container at `path` and everything beneath it.
    ///
    /// A missing container is not an error.
    pub fn delete_container(&self, path: &BlobPath) -> StoreResult<()> {
        if self.config.read_only {
            return Err(StoreError::ReadOnly);
        }
        let dir = self.container_dir(path)?;
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(container = %path, "deleted container");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
