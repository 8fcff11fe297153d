use serde::{Deserialize, Serialize};

/// Name and byte length of a stored blob.
///
/// Produced from a stat at list time; never cached by a container.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub name: String,
    pub length: u64,
}

impl BlobMetadata {
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn length(&self) -> u64 {
        self.length
    }
}
