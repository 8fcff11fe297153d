//! Blob name validation.
//!
//! A blob name is exactly one path segment inside a container directory:
//! - Must be non-empty
//! - Must not be `.` or `..`
//! - Must not contain `/`, `\` or a NUL byte

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Characters that are forbidden anywhere in a blob name.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', '\0'];

/// Validate a blob name, returning `Ok(())` if it is a single safe segment.
///
/// # Examples
///
/// ```
/// use fsblob_types::validate_blob_name;
///
/// assert!(validate_blob_name("index-0").is_ok());
/// assert!(validate_blob_name("").is_err());
/// assert!(validate_blob_name("..").is_err());
/// assert!(validate_blob_name("a/b").is_err());
/// ```
pub fn validate_blob_name(name: &str) -> Result<(), TypeError> {
    let reject = |reason: String| TypeError::InvalidBlobName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(reject("blob name must not be empty".into()));
    }

    if name == "." || name == ".." {
        return Err(reject("reserved path segment".into()));
    }

    if let Some(ch) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(reject(format!("contains forbidden character: {ch:?}")));
    }

    Ok(())
}

/// A validated blob name.
///
/// Construction goes through [`validate_blob_name`], so a `BlobName` can be
/// joined onto a container directory without escaping it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobName(String);

impl BlobName {
    /// Validate and wrap a name.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_blob_name(&name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlobName {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for BlobName {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BlobName> for String {
    fn from(name: BlobName) -> Self {
        name.0
    }
}

impl AsRef<str> for BlobName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
