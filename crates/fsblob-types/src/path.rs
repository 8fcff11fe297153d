use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::name::validate_blob_name;

/// Hierarchical location of a container inside a larger blob repository.
///
/// A `BlobPath` is an ordered list of segments with structural equality.
/// Containers store it and hand it back unchanged; only the parent store
/// interprets it when mapping a path onto a directory.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobPath {
    segments: Vec<String>,
}

impl BlobPath {
    /// The empty path, naming the repository root.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            segments: segments.into_iter().map(Into::into).collect(),
        }
    }

    /// Return a child path with `segment` appended. `self` is unchanged.
    pub fn add(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The enclosing path, or `None` at the root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Join the segments with `separator`, ending with a trailing separator.
    ///
    /// The root path renders as the empty string.
    pub fn build_as_string(&self, separator: &str) -> String {
        if self.segments.is_empty() {
            return String::new();
        }
        let mut joined = self.segments.join(separator);
        joined.push_str(separator);
        joined
    }

    /// Check every segment is usable as a directory name.
    pub fn check_segments(&self) -> Result<(), TypeError> {
        for segment in &self.segments {
            validate_blob_name(segment).map_err(|e| match e {
                TypeError::InvalidBlobName { reason, .. } => TypeError::InvalidPathSegment {
                    segment: segment.clone(),
                    reason,
                },
                other => other,
            })?;
        }
        Ok(())
    }
}

impl fmt::Display for BlobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.segments.join("/"))
    }
}

impl<S: Into<String>> FromIterator<S> for BlobPath {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_segments(iter)
    }
}
