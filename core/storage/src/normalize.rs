//! Translation between logical blob keys and backend-native keys.

use assetstore_common::{BlobKey, Error, Result};

/// Composes and strips the container/folder decoration of native keys.
///
/// Native keys are `{folder}/{logical key}` (or just the logical key when no
/// folder is configured). Decorated keys additionally carry the container:
/// `{container}/{native key}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyNormalizer {
    container: String,
    folder: String,
}

impl KeyNormalizer {
    /// Create a normalizer; surrounding `/` on the folder are ignored.
    pub fn new(container: impl Into<String>, folder: &str) -> Self {
        Self {
            container: container.into(),
            folder: folder.trim_matches('/').to_string(),
        }
    }

    /// Configured container name.
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Configured folder prefix, without surrounding slashes.
    pub fn folder(&self) -> &str {
        &self.folder
    }

    /// Same folder, different container.
    pub fn for_container(&self, container: &str) -> Self {
        Self {
            container: container.to_string(),
            folder: self.folder.clone(),
        }
    }

    /// Native key for a logical key.
    pub fn to_native(&self, key: &BlobKey) -> String {
        if self.folder.is_empty() {
            key.as_str()
        } else {
            format!("{}/{}", self.folder, key)
        }
    }

    /// Native listing prefix for a logical root.
    ///
    /// Ends with `/` unless both folder and root are empty. A non-empty root
    /// follows the key segment rules, so it cannot leave the folder.
    ///
    /// # Errors
    /// - Root has an empty, `.` or `..` segment, or a backslash (`InvalidInput`)
    pub fn scope(&self, root: &str) -> Result<String> {
        let root = root.trim_matches('/');
        let root = if root.is_empty() {
            String::new()
        } else {
            BlobKey::parse(root)
                .map_err(|e| Error::InvalidInput(format!("Invalid listing root {}: {}", root, e)))?
                .as_str()
        };
        let joined = match (self.folder.is_empty(), root.is_empty()) {
            (true, true) => return Ok(String::new()),
            (true, false) => root,
            (false, true) => self.folder.clone(),
            (false, false) => format!("{}/{}", self.folder, root),
        };
        Ok(format!("{}/", joined))
    }

    /// Logical key for a native key, or `None` when outside the folder.
    pub fn to_logical(&self, native: &str) -> Option<String> {
        let native = native.trim_start_matches('/');
        let logical = if self.folder.is_empty() {
            native
        } else {
            native
                .strip_prefix(self.folder.as_str())?
                .strip_prefix('/')?
        };
        if logical.is_empty() {
            None
        } else {
            Some(logical.to_string())
        }
    }

    /// Prefix a native key with the container.
    pub fn decorate(&self, native: &str) -> String {
        format!("{}/{}", self.container, native.trim_start_matches('/'))
    }

    /// Recover the native key from a decorated one.
    pub fn strip_decoration<'a>(&self, decorated: &'a str) -> Option<&'a str> {
        decorated
            .trim_start_matches('/')
            .strip_prefix(self.container.as_str())?
            .strip_prefix('/')
    }
}
