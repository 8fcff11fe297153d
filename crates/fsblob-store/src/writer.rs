//! Durable blob writer.
//!
//! [`DurableWriter`] buffers writes in front of the blob file and commits
//! them in [`finish`](DurableWriter::finish), in this order:
//!
//! 1. flush the buffer and close the file handle
//! 2. fsync the file
//! 3. fsync the containing directory
//!
//! After a crash a finished blob is either fully present or absent; a name
//! pointing at unsynced contents cannot survive recovery. Errors from every
//! step are returned, never swallowed in a destructor.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::sync::Syncer;
use crate::traits::BlobOutput;

/// Buffered writer for one blob, made durable by [`finish`](Self::finish).
pub struct DurableWriter<W: Write = File> {
    /// `None` once finished.
    sink: Option<BufWriter<W>>,
    name: String,
    file_path: PathBuf,
    dir: PathBuf,
    syncer: Arc<dyn Syncer>,
    bytes_written: u64,
}

impl DurableWriter<File> {
    /// Create (or truncate) `dir/name` and wrap it in a buffer of `buffer_size` bytes.
    pub(crate) fn create(
        dir: &Path,
        name: &str,
        buffer_size: usize,
        syncer: Arc<dyn Syncer>,
    ) -> StoreResult<Self> {
        let file_path = dir.join(name);
        let file = File::create(&file_path).map_err(|e| StoreError::from_io(name, e))?;
        Ok(Self::with_sink(file, dir, name, buffer_size, syncer))
    }
}

impl<W: Write> DurableWriter<W> {
    /// Wrap an already-open sink for the blob `dir/name`.
    pub(crate) fn with_sink(
        sink: W,
        dir: &Path,
        name: &str,
        buffer_size: usize,
        syncer: Arc<dyn Syncer>,
    ) -> Self {
        Self {
            sink: Some(BufWriter::with_capacity(buffer_size, sink)),
            name: name.to_string(),
            file_path: dir.join(name),
            dir: dir.to_path_buf(),
            syncer,
            bytes_written: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Filesystem path of the blob being written.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Commit the blob: flush and close, fsync the file, fsync the directory.
    ///
    /// On error the blob may be partially written or not yet durable; the
    /// caller should delete or overwrite it.
    pub fn finish(mut self) -> StoreResult<u64> {
        let Some(sink) = self.sink.take() else {
            return Err(StoreError::Io(io::Error::other("blob writer already finished")));
        };

        let result = self.commit(sink);
        match &result {
            Ok(len) => debug!(blob = %self.name, bytes = len, "blob committed"),
            Err(e) => warn!(blob = %self.name, error = %e, "blob commit failed"),
        }
        result
    }

    fn commit(&self, sink: BufWriter<W>) -> StoreResult<u64> {
        let file = sink.into_inner().map_err(|e| e.into_error())?;
        drop(file);

        self.syncer.sync_file(&self.file_path)?;
        self.syncer.sync_dir(&self.dir)?;
        Ok(self.bytes_written)
    }

    fn sink_mut(&mut self) -> io::Result<&mut BufWriter<W>> {
        self.sink
            .as_mut()
            .ok_or_else(|| io::Error::other("blob writer already finished"))
    }
}

impl<W: Write> Write for DurableWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.sink_mut()?.write(buf)?;
        self.bytes_written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink_mut()?.flush()
    }
}

impl<W: Write + Send> BlobOutput for DurableWriter<W> {
    fn finish(self: Box<Self>) -> StoreResult<u64> {
        DurableWriter::finish(*self)
    }
}

impl<W: Write> Drop for DurableWriter<W> {
    fn drop(&mut self) {
        if self.sink.is_some() {
            warn!(
                blob = %self.name,
                dir = %self.dir.display(),
                "blob writer dropped without finish; contents are not durable"
            );
        }
    }
}

impl<W: Write> std::fmt::Debug for DurableWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableWriter")
            .field("path", &self.file_path)
            .field("bytes_written", &self.bytes_written)
            .field("finished", &self.sink.is_none())
            .finish()
    }
}
