//! Filesystem-backed blob container.
//!
//! One container is one directory; each blob is one regular file named by
//! its blob name. There are no sidecar files, indexes or manifests.
//!
//! ```text
//! {dir}/
//! ├── greeting.txt     # blob "greeting.txt"
//! ├── index-0          # blob "index-0"
//! └── nested/          # ignored: not a regular file
//! ```

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use fsblob_types::{validate_blob_name, BlobMetadata, BlobPath};
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::sync::{OsSyncer, Syncer};
use crate::traits::{BlobContainer, BlobOutput};
use crate::writer::DurableWriter;

/// A blob container bound to one filesystem directory.
///
/// Holds no open file handles between calls. Safe to share across threads,
/// provided callers do not target the same blob name concurrently.
#[derive(Clone)]
pub struct FsBlobContainer {
    path: BlobPath,
    dir: PathBuf,
    buffer_size: usize,
    read_only: bool,
    syncer: Arc<dyn Syncer>,
}

impl FsBlobContainer {
    /// Bind `path` to the existing directory `dir`.
    ///
    /// `buffer_size` sizes the read and write buffers and must be positive.
    pub fn new(path: BlobPath, dir: impl Into<PathBuf>, buffer_size: usize) -> Self {
        Self {
            path,
            dir: dir.into(),
            buffer_size: buffer_size.max(1),
            read_only: false,
            syncer: Arc::new(OsSyncer),
        }
    }

    /// Reject every mutating operation with [`StoreError::ReadOnly`].
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Replace the sync layer.
    pub fn with_syncer(mut self, syncer: Arc<dyn Syncer>) -> Self {
        self.syncer = syncer;
        self
    }

    /// The directory backing this container.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Open a buffered reader over `name`.
    pub fn open_reader(&self, name: &str) -> StoreResult<BufReader<File>> {
        let file_path = self.resolve(name)?;
        let file = File::open(&file_path).map_err(|e| StoreError::from_io(name, e))?;
        debug!(container = %self.path, blob = name, "opened blob for reading");
        Ok(BufReader::with_capacity(self.buffer_size, file))
    }

    /// Open a durable writer over `name`, truncating any existing blob.
    pub fn create_writer(&self, name: &str) -> StoreResult<DurableWriter> {
        self.check_writable()?;
        validate_blob_name(name)?;
        let writer = DurableWriter::create(&self.dir, name, self.buffer_size, self.syncer.clone())?;
        debug!(container = %self.path, blob = name, "opened blob for writing");
        Ok(writer)
    }

    fn resolve(&self, name: &str) -> StoreResult<PathBuf> {
        validate_blob_name(name)?;
        Ok(self.dir.join(name))
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.read_only {
            return Err(StoreError::ReadOnly);
        }
        Ok(())
    }

    /// Rename without replacing an existing target.
    #[cfg(target_os = "linux")]
    fn rename_no_replace(&self, source: &Path, target: &Path) -> io::Result<()> {
        use rustix::fs::{renameat_with, RenameFlags, CWD};
        use rustix::io::Errno;

        match renameat_with(CWD, source, CWD, target, RenameFlags::NOREPLACE) {
            Ok(()) => Ok(()),
            // Kernel or filesystem without RENAME_NOREPLACE support.
            Err(e) if e == Errno::INVAL || e == Errno::NOSYS => self.rename_checked(source, target),
            Err(e) => Err(e.into()),
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn rename_no_replace(&self, source: &Path, target: &Path) -> io::Result<()> {
        self.rename_checked(source, target)
    }

    /// Check-then-rename. Racy against a concurrent creator of `target`.
    fn rename_checked(&self, source: &Path, target: &Path) -> io::Result<()> {
        if target.try_exists()? {
            return Err(io::Error::from(io::ErrorKind::AlreadyExists));
        }
        fs::rename(source, target)
    }
}

impl BlobContainer for FsBlobContainer {
    fn path(&self) -> &BlobPath {
        &self.path
    }

    fn list_blobs(&self) -> StoreResult<BTreeMap<String, BlobMetadata>> {
        let mut blobs = BTreeMap::new();

        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_path = entry.path();

            // Follows symlinks: a link to a regular file is a blob.
            let meta = match fs::metadata(&file_path) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(path = %file_path.display(), "entry vanished during listing");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            if !meta.is_file() {
                continue;
            }

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(name = ?raw, "skipping blob with non UTF-8 name");
                    continue;
                }
            };

            // Later observations replace earlier ones.
            blobs.insert(name.clone(), BlobMetadata::new(name, meta.len()));
        }

        debug!(container = %self.path, count = blobs.len(), "listed blobs");
        Ok(blobs)
    }

    fn blob_exists(&self, name: &str) -> StoreResult<bool> {
        let file_path = self.resolve(name)?;
        let exists = file_path.try_exists()?;
        debug!(container = %self.path, blob = name, exists, "checked blob");
        Ok(exists)
    }

    fn open_input(&self, name: &str) -> StoreResult<Box<dyn Read + Send>> {
        Ok(Box::new(self.open_reader(name)?))
    }

    fn create_output(&self, name: &str) -> StoreResult<Box<dyn BlobOutput>> {
        Ok(Box::new(self.create_writer(name)?))
    }

    fn delete_blob(&self, name: &str) -> StoreResult<()> {
        self.check_writable()?;
        let file_path = self.resolve(name)?;
        match fs::remove_file(&file_path) {
            Ok(()) => {
                debug!(container = %self.path, blob = name, "deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn move_blob(&self, source: &str, target: &str) -> StoreResult<()> {
        self.check_writable()?;
        let source_path = self.resolve(source)?;
        let target_path = self.resolve(target)?;

        if !source_path.try_exists()? {
            return Err(StoreError::NotFound(source.to_string()));
        }

        self.rename_no_replace(&source_path, &target_path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::AlreadyExists => StoreError::AlreadyExists(target.to_string()),
                io::ErrorKind::NotFound => StoreError::NotFound(source.to_string()),
                _ => StoreError::Io(e),
            })?;

        self.syncer.sync_dir(&self.dir)?;
        debug!(container = %self.path, source, target, "moved blob");
        Ok(())
    }
}

impl std::fmt::Debug for FsBlobContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsBlobContainer")
            .field("path", &self.path)
            .field("dir", &self.dir)
            .field("buffer_size", &self.buffer_size)
            .field("read_only", &self.read_only)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::testing::{CrashSyncer, SyncOp};
    use proptest::prelude::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn container() -> (TempDir, FsBlobContainer) {
        let dir = tempfile::tempdir().unwrap();
        let container = FsBlobContainer::new(BlobPath::root().add("test"), dir.path(), 64);
        (dir, container)
    }

    fn lengths(container: &FsBlobContainer) -> BTreeMap<String, u64> {
        container
            .list_blobs()
            .unwrap()
            .into_iter()
            .map(|(name, meta)| (name, meta.length))
            .collect()
    }

    #[test]
    fn create_then_read() {
        let (_dir, container) = container();
        let mut output = container.create_output("greeting.txt").unwrap();
        output.write_all(b"hello\n").unwrap();
        assert_eq!(output.finish().unwrap(), 6);

        assert_eq!(lengths(&container), BTreeMap::from([("greeting.txt".to_string(), 6)]));
        let meta = &container.list_blobs().unwrap()["greeting.txt"];
        assert_eq!(meta.name, "greeting.txt");
        assert_eq!(container.read_blob("greeting.txt").unwrap(), b"hello\n");
    }

    #[test]
    fn empty_write() {
        let (_dir, container) = container();
        container.write_blob("empty", b"").unwrap();

        assert_eq!(lengths(&container), BTreeMap::from([("empty".to_string(), 0)]));
        let mut input = container.open_input("empty").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(input.read(&mut buf).unwrap(), 0);
    }

    #[test]
    fn stage_and_move() {
        let (_dir, container) = container();
        container.write_blob("tmp-uuid", b"payload").unwrap();
        container.move_blob("tmp-uuid", "final").unwrap();

        let listed = lengths(&container);
        assert_eq!(listed.get("final"), Some(&7));
        assert!(!listed.contains_key("tmp-uuid"));
        assert!(!container.blob_exists("tmp-uuid").unwrap());
        assert!(container.blob_exists("final").unwrap());
        assert_eq!(container.read_blob("final").unwrap(), b"payload");
    }

    #[test]
    fn delete_missing_blob_succeeds() {
        let (_dir, container) = container();
        container.delete_blob("ghost").unwrap();
        assert!(!container.blob_exists("ghost").unwrap());
    }

    #[test]
    fn delete_is_idempotent() {
        let (_dir, container) = container();
        container.write_blob("doomed", b"x").unwrap();
        container.delete_blob("doomed").unwrap();
        assert!(!container.blob_exists("doomed").unwrap());
        container.delete_blob("doomed").unwrap();
        assert!(!container.blob_exists("doomed").unwrap());
    }

    #[test]
    fn move_onto_existing_target_is_rejected() {
        let (_dir, container) = container();
        container.write_blob("a", b"A").unwrap();
        container.write_blob("b", b"B").unwrap();

        let err = container.move_blob("a", "b").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(ref n) if n == "b"), "{err:?}");
        assert_eq!(container.read_blob("a").unwrap(), b"A");
        assert_eq!(container.read_blob("b").unwrap(), b"B");
    }

    #[test]
    fn move_missing_source_is_not_found() {
        let (_dir, container) = container();
        let err = container.move_blob("absent", "target").unwrap_err();
        assert!(err.is_not_found());
        assert!(!container.blob_exists("target").unwrap());
    }

    #[test]
    fn listing_skips_directories() {
        let (dir, container) = container();
        fs::write(dir.path().join("f1"), b"abcd").unwrap();
        fs::create_dir(dir.path().join("d1")).unwrap();
        fs::write(dir.path().join("f2"), b"").unwrap();

        assert_eq!(
            lengths(&container),
            BTreeMap::from([("f1".to_string(), 4), ("f2".to_string(), 0)])
        );
    }

    #[test]
    fn listing_empty_directory() {
        let (_dir, container) = container();
        assert!(container.list_blobs().unwrap().is_empty());
    }

    #[test]
    fn listing_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let container = FsBlobContainer::new(BlobPath::root(), dir.path().join("gone"), 64);
        assert!(matches!(container.list_blobs(), Err(StoreError::Io(_))));
    }

    #[cfg(unix)]
    #[test]
    fn listing_follows_file_symlinks_only() {
        use std::os::unix::fs::symlink;

        let (dir, container) = container();
        fs::write(dir.path().join("real"), b"123").unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        symlink(dir.path().join("real"), dir.path().join("link-to-file")).unwrap();
        symlink(dir.path().join("sub"), dir.path().join("link-to-dir")).unwrap();
        symlink(dir.path().join("nowhere"), dir.path().join("dangling")).unwrap();

        assert_eq!(
            lengths(&container),
            BTreeMap::from([("link-to-file".to_string(), 3), ("real".to_string(), 3)])
        );
    }

    #[cfg(unix)]
    #[test]
    fn stat_failures_are_not_swallowed() {
        use std::os::unix::fs::symlink;

        let (dir, container) = container();
        fs::write(dir.path().join("fine"), b"ok").unwrap();
        symlink("loop", dir.path().join("loop")).unwrap();

        let is_loop = |err: StoreError| {
            matches!(err, StoreError::Io(ref e) if format!("{:?}", e.kind()) == "FilesystemLoop")
        };
        assert!(is_loop(container.blob_exists("loop").unwrap_err()));
        assert!(is_loop(container.list_blobs().unwrap_err()));
    }

    #[test]
    fn move_onto_itself_is_rejected() {
        let (_dir, container) = container();
        container.write_blob("a", b"A").unwrap();
        assert!(matches!(container.move_blob("a", "a"), Err(StoreError::AlreadyExists(ref n)) if n == "a"));
        assert_eq!(container.read_blob("a").unwrap(), b"A");
    }

    #[test]
    fn exists_sees_directories() {
        let (dir, container) = container();
        fs::create_dir(dir.path().join("nested")).unwrap();
        assert!(container.blob_exists("nested").unwrap());
        assert!(!container.list_blobs().unwrap().contains_key("nested"));
    }

    #[test]
    fn open_missing_blob_is_not_found() {
        let (_dir, container) = container();
        let err = container.open_input("missing").err().unwrap();
        assert!(matches!(err, StoreError::NotFound(ref n) if n == "missing"));
    }

    #[test]
    fn create_output_overwrites() {
        let (_dir, container) = container();
        container.write_blob("blob", b"first version").unwrap();
        container.write_blob("blob", b"second").unwrap();
        assert_eq!(container.read_blob("blob").unwrap(), b"second");
    }

    #[test]
    fn invalid_names_are_rejected() {
        let (dir, container) = container();
        fs::write(dir.path().join("inside"), b"x").unwrap();

        for name in ["", ".", "..", "../escape", "a/b"] {
            assert!(matches!(container.blob_exists(name), Err(StoreError::InvalidName(_))), "{name:?}");
            assert!(matches!(container.open_input(name).err(), Some(StoreError::InvalidName(_))));
            assert!(matches!(container.create_output(name).err(), Some(StoreError::InvalidName(_))));
            assert!(matches!(container.delete_blob(name), Err(StoreError::InvalidName(_))));
            assert!(matches!(container.move_blob("inside", name), Err(StoreError::InvalidName(_))));
        }
        assert!(container.blob_exists("inside").unwrap());
    }

    #[test]
    fn read_only_rejects_mutation() {
        let (_dir, container) = container();
        container.write_blob("kept", b"data").unwrap();
        let container = container.read_only(true);

        assert!(matches!(container.create_output("new").err(), Some(StoreError::ReadOnly)));
        assert!(matches!(container.delete_blob("kept"), Err(StoreError::ReadOnly)));
        assert!(matches!(container.move_blob("kept", "other"), Err(StoreError::ReadOnly)));
        assert_eq!(container.read_blob("kept").unwrap(), b"data");
        assert_eq!(container.list_blobs().unwrap().len(), 1);
    }

    #[test]
    fn move_syncs_directory_after_rename() {
        let dir = tempfile::tempdir().unwrap();
        let syncer = Arc::new(CrashSyncer::new());
        let container = FsBlobContainer::new(BlobPath::root(), dir.path(), 64)
            .with_syncer(syncer.clone());

        container.write_blob("staged", b"bytes").unwrap();
        container.move_blob("staged", "final").unwrap();

        let ops = syncer.ops();
        assert_eq!(ops.last(), Some(&SyncOp::Dir(dir.path().to_path_buf())));
        let recovered = syncer.recovered(dir.path());
        assert_eq!(recovered.keys().collect::<Vec<_>>(), vec!["final"]);
    }

    #[test]
    fn move_reports_directory_sync_failure() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("src"), b"x").unwrap();
        let syncer = Arc::new(CrashSyncer::failing_dir_sync());
        let container = FsBlobContainer::new(BlobPath::root(), dir.path(), 64)
            .with_syncer(syncer);

        assert!(matches!(container.move_blob("src", "dst"), Err(StoreError::Io(_))));
        // The rename itself happened; only its durability is in doubt.
        assert!(container.blob_exists("dst").unwrap());
    }

    #[test]
    fn atomic_write_publishes_under_final_name() {
        let (_dir, container) = container();
        container.write_blob_atomic("snap-1", b"snapshot").unwrap();

        assert_eq!(lengths(&container), BTreeMap::from([("snap-1".to_string(), 8)]));
        let err = container.write_blob_atomic("snap-1", b"again").unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert_eq!(container.read_blob("snap-1").unwrap(), b"snapshot");
    }

    #[test]
    fn atomic_write_cleans_up_after_failed_commit() {
        let dir = tempfile::tempdir().unwrap();
        let container = FsBlobContainer::new(BlobPath::root(), dir.path(), 64)
            .with_syncer(Arc::new(CrashSyncer::failing_file_sync()));

        assert!(container.write_blob_atomic("snap", b"data").is_err());
        assert!(container.list_blobs().unwrap().is_empty());
    }

    #[test]
    fn concurrent_writers_on_distinct_names() {
        let (_dir, container) = container();
        let container = Arc::new(container);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let container = container.clone();
                std::thread::spawn(move || {
                    let name = format!("blob-{i}");
                    container.write_blob(&name, name.as_bytes()).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let listed = container.list_blobs().unwrap();
        assert_eq!(listed.len(), 8);
        for (name, meta) in listed {
            assert_eq!(meta.length, name.len() as u64);
        }
    }

    #[test]
    fn works_through_trait_object() {
        let (_dir, container) = container();
        let shared: Arc<dyn BlobContainer> = Arc::new(container);
        shared.write_blob("x", b"via dyn").unwrap();
        assert_eq!(shared.path(), &BlobPath::root().add("test"));
        assert_eq!(shared.read_blob("x").unwrap(), b"via dyn");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn write_then_read_returns_same_bytes(
            name in "[a-z0-9][a-z0-9._-]{0,15}",
            data in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let (_dir, container) = container();
            container.write_blob(&name, &data).unwrap();
            prop_assert_eq!(container.read_blob(&name).unwrap(), data.clone());
            prop_assert_eq!(container.list_blobs().unwrap()[&name].length, data.len() as u64);
        }
    }
}
