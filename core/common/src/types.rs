//! Common types used throughout the storage layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical identifier of a stored object, relative to a provider's folder.
///
/// A key is a non-empty, `/`-separated sequence of segments. It never
/// carries the container or folder prefix; providers add those when they
/// translate the key to a native one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobKey {
    segments: Vec<String>,
}

impl BlobKey {
    /// Parse a key string.
    ///
    /// Leading and trailing `/` are ignored. Uses `/` as separator.
    ///
    /// # Errors
    /// - Key is empty
    /// - A segment is empty, `.` or `..`
    /// - Key contains a backslash
    pub fn parse(key: &str) -> crate::Result<Self> {
        let trimmed = key.trim_matches('/');
        if trimmed.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Blob key cannot be empty".to_string(),
            ));
        }

        let segments: Vec<String> = trimmed.split('/').map(String::from).collect();
        Self::from_segments(segments)
    }

    /// Create a key from individual segments.
    pub fn from_segments(segments: Vec<String>) -> crate::Result<Self> {
        if segments.is_empty() {
            return Err(crate::Error::InvalidInput(
                "Blob key cannot be empty".to_string(),
            ));
        }
        for segment in &segments {
            validate_segment(segment)?;
        }
        Ok(Self { segments })
    }

    /// Append a child segment.
    pub fn join(&self, child: &str) -> crate::Result<Self> {
        validate_segment(child)?;
        let mut segments = self.segments.clone();
        segments.push(child.to_string());
        Ok(Self { segments })
    }

    /// Last segment of the key.
    pub fn name(&self) -> &str {
        // Construction guarantees at least one segment.
        self.segments.last().map(String::as_str).unwrap_or_default()
    }

    /// Extension of the last segment, without the dot.
    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// The key segments.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The key as a `/`-joined string, without leading slash.
    pub fn as_str(&self) -> String {
        self.segments.join("/")
    }
}

fn validate_segment(segment: &str) -> crate::Result<()> {
    if segment.is_empty() {
        return Err(crate::Error::InvalidInput(
            "Key segment cannot be empty".to_string(),
        ));
    }
    if segment == "." || segment == ".." {
        return Err(crate::Error::InvalidInput(format!(
            "Key segment '{}' is not allowed",
            segment
        )));
    }
    if segment.contains('/') || segment.contains('\\') {
        return Err(crate::Error::InvalidInput(
            "Key segment cannot contain separators".to_string(),
        ));
    }
    Ok(())
}

impl fmt::Display for BlobKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for BlobKey {
    type Error = crate::Error;

    fn try_from(value: String) -> crate::Result<Self> {
        Self::parse(&value)
    }
}

impl From<BlobKey> for String {
    fn from(key: BlobKey) -> Self {
        key.as_str()
    }
}
