//! The fsync layer.
//!
//! Durability in a blob container comes from two kinds of sync: forcing a
//! file's contents to stable storage, and forcing a directory's entries to
//! stable storage. Both go through [`Syncer`] so tests can observe and fault
//! the sequence.

use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use crate::error::{StoreError, StoreResult};

/// Forces file contents and directory entries to durable storage.
pub trait Syncer: Send + Sync + fmt::Debug {
    /// Force the data (and size) of the file at `path` to stable storage.
    fn sync_file(&self, path: &Path) -> StoreResult<()>;

    /// Force the entries of the directory at `path` to stable storage.
    fn sync_dir(&self, path: &Path) -> StoreResult<()>;
}

/// Syncs through the operating system.
///
/// Directory sync needs the directory to be openable as a file. Where that
/// is impossible (non-Unix targets) or the filesystem rejects it, the call
/// fails with [`StoreError::DirSyncUnsupported`].
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSyncer;

impl Syncer for OsSyncer {
    fn sync_file(&self, path: &Path) -> StoreResult<()> {
        let file = open_for_sync(path)?;
        file.sync_data()?;
        Ok(())
    }

    #[cfg(unix)]
    fn sync_dir(&self, path: &Path) -> StoreResult<()> {
        let dir = File::open(path)?;
        dir.sync_all().map_err(|e| dir_sync_error(path, e))
    }

    #[cfg(not(unix))]
    fn sync_dir(&self, path: &Path) -> StoreResult<()> {
        Err(StoreError::DirSyncUnsupported(path.to_path_buf()))
    }
}

#[cfg(unix)]
fn open_for_sync(path: &Path) -> io::Result<File> {
    File::open(path)
}

// Windows only flushes handles opened with write access.
#[cfg(not(unix))]
fn open_for_sync(path: &Path) -> io::Result<File> {
    std::fs::OpenOptions::new().write(true).open(path)
}

#[cfg_attr(not(unix), allow(dead_code))]
fn dir_sync_error(path: &Path, err: io::Error) -> StoreError {
    match err.kind() {
        io::ErrorKind::InvalidInput | io::ErrorKind::Unsupported => {
            StoreError::DirSyncUnsupported(path.to_path_buf())
        }
        _ => StoreError::Io(err),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! A syncer that models what survives a crash.
    //!
    //! File contents become durable at `sync_file`; directory entries become
    //! durable at `sync_dir`. Anything not synced is lost in a simulated crash.

    use std::collections::{BTreeMap, BTreeSet, HashMap};
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use super::Syncer;
    use crate::error::{StoreError, StoreResult};

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum SyncOp {
        File(PathBuf),
        Dir(PathBuf),
    }

    #[derive(Debug, Default)]
    pub struct CrashSyncer {
        ops: Mutex<Vec<SyncOp>>,
        durable_contents: Mutex<HashMap<PathBuf, Vec<u8>>>,
        durable_entries: Mutex<HashMap<PathBuf, BTreeSet<String>>>,
        pub fail_file_sync: AtomicBool,
        pub fail_dir_sync: AtomicBool,
    }

    fn injected(what: &str) -> StoreError {
        StoreError::Io(io::Error::other(format!("injected {what} failure")))
    }

    impl CrashSyncer {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn failing_dir_sync() -> Self {
            let syncer = Self::default();
            syncer.fail_dir_sync.store(true, Ordering::SeqCst);
            syncer
        }

        pub fn failing_file_sync() -> Self {
            let syncer = Self::default();
            syncer.fail_file_sync.store(true, Ordering::SeqCst);
            syncer
        }

        pub fn ops(&self) -> Vec<SyncOp> {
            self.ops.lock().unwrap().clone()
        }

        /// Blobs visible in `dir` after a crash at this instant.
        ///
        /// A durable name whose contents were never synced maps to `None`:
        /// the dangling-name outcome that the close protocol must rule out.
        pub fn recovered(&self, dir: &Path) -> BTreeMap<String, Option<Vec<u8>>> {
            let entries = self.durable_entries.lock().unwrap();
            let contents = self.durable_contents.lock().unwrap();
            entries
                .get(dir)
                .map(|names| {
                    names
                        .iter()
                        .map(|name| (name.clone(), contents.get(&dir.join(name)).cloned()))
                        .collect()
                })
                .unwrap_or_default()
        }
    }

    impl Syncer for CrashSyncer {
        fn sync_file(&self, path: &Path) -> StoreResult<()> {
            self.ops.lock().unwrap().push(SyncOp::File(path.to_path_buf()));
            if self.fail_file_sync.load(Ordering::SeqCst) {
                return Err(injected("file fsync"));
            }
            let data = fs::read(path)?;
            self.durable_contents
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), data);
            Ok(())
        }

        fn sync_dir(&self, path: &Path) -> StoreResult<()> {
            self.ops.lock().unwrap().push(SyncOp::Dir(path.to_path_buf()));
            if self.fail_dir_sync.load(Ordering::SeqCst) {
                return Err(injected("directory fsync"));
            }
            let mut names = BTreeSet::new();
            for entry in fs::read_dir(path)? {
                let entry = entry?;
                if let Ok(name) = entry.file_name().into_string() {
                    names.insert(name);
                }
            }
            self.durable_entries
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), names);
            Ok(())
        }
    }
}
