use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default read/write buffer size: 100 KiB.
pub const DEFAULT_BUFFER_SIZE: usize = 100 * 1024;

/// Errors from loading or validating a [`StoreConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("buffer_size_bytes must be positive")]
    ZeroBufferSize,
}

/// Configuration for a filesystem blob store.
///
/// ```toml
/// [store]
/// root = "/var/lib/snapshots"
/// buffer_size_bytes = 65536
/// read_only = false
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory under which container paths are resolved.
    pub root: PathBuf,
    /// Read and write buffer size handed to every container.
    #[serde(default = "default_buffer_size")]
    pub buffer_size_bytes: usize,
    /// Reject every mutating operation.
    #[serde(default)]
    pub read_only: bool,
}

fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            buffer_size_bytes: DEFAULT_BUFFER_SIZE,
            read_only: false,
        }
    }
}

#[derive(Deserialize)]
struct StoreSection {
    store: StoreConfig,
}

impl StoreConfig {
    /// A writable configuration rooted at `root` with default buffering.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Parse from TOML. Accepts either a `[store]` table or top-level keys.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = contents.parse()?;
        let config = if table.contains_key("store") {
            toml::Value::Table(table).try_into::<StoreSection>()?.store
        } else {
            toml::Value::Table(table).try_into::<StoreConfig>()?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size_bytes == 0 {
            return Err(ConfigError::ZeroBufferSize);
        }
        Ok(())
    }
}
