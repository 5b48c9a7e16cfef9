//! Storage provider trait definition.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use assetstore_common::{BlobKey, Error, Result};

use crate::assets::Asset;
use crate::lifecycle::ProviderState;

/// Family of native API a backend translates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Hierarchical filesystem.
    LocalFilesystem,
    /// Process-local map, for tests and development.
    InMemory,
    /// Flat key space inside a single bucket (S3 and compatibles).
    FlatObjectStore,
    /// Account with independently managed containers of blobs.
    TwoTierBlobStore,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::LocalFilesystem => "local filesystem",
            Self::InMemory => "in-memory",
            Self::FlatObjectStore => "flat object store",
            Self::TwoTierBlobStore => "two-tier blob store",
        };
        f.write_str(label)
    }
}

/// Operations a provider can carry out.
///
/// A `false` flag means the matching trait method fails with
/// `Error::Unsupported`, so callers can branch before calling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub read: bool,
    pub write: bool,
    pub list: bool,
    pub delete: bool,
    pub manage_containers: bool,
    pub discover_assets: bool,
}

impl Capabilities {
    /// Every operation supported.
    pub const fn full() -> Self {
        Self {
            read: true,
            write: true,
            list: true,
            delete: true,
            manage_containers: true,
            discover_assets: true,
        }
    }

    /// Copy with container management switched off.
    pub const fn without_containers(self) -> Self {
        Self {
            manage_containers: false,
            ..self
        }
    }
}

/// Storage provider trait for different backends.
///
/// All operations are async. Every data operation fails with
/// `Error::NotReady` until [`initialize`](StorageProvider::initialize) has
/// succeeded on this instance. Listing order is whatever the backend
/// returns; callers must not assume lexicographic order.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider name (e.g., "s3", "local", "azblob").
    fn name(&self) -> &str;

    /// Native API family of this backend.
    fn kind(&self) -> BackendKind;

    /// Operations this backend supports.
    fn capabilities(&self) -> Capabilities;

    /// Current lifecycle state.
    fn state(&self) -> ProviderState;

    /// Connect and verify the backend with a real listing round-trip.
    ///
    /// # Postconditions
    /// - On success the provider is `Ready`
    /// - On failure the provider is `Failed` for the rest of its life
    ///
    /// # Errors
    /// - Backend unreachable or credentials rejected (`Connection`)
    /// - Options incomplete (`Config`)
    async fn initialize(&self) -> Result<()>;

    /// Read an object and decode it as UTF-8 text.
    ///
    /// # Errors
    /// - Key absent (`NotFound`)
    /// - Transport failure or invalid UTF-8 (`Read`)
    async fn read_text(&self, key: &BlobKey) -> Result<String> {
        let bytes = self.read_binary(key).await?;
        String::from_utf8(bytes)
            .map_err(|e| Error::Read(format!("{} is not valid UTF-8: {}", key, e)))
    }

    /// Read an object's raw bytes.
    ///
    /// # Errors
    /// - Key absent (`NotFound`)
    /// - Transport failure (`Read`)
    async fn read_binary(&self, key: &BlobKey) -> Result<Vec<u8>>;

    /// Write text content, overwriting any existing object at `key`.
    ///
    /// # Errors
    /// - Transport failure (`Write`)
    /// - Backend cannot write (`Unsupported`)
    async fn write_text(&self, key: &BlobKey, content: &str) -> Result<()> {
        self.write_binary(key, content.as_bytes().to_vec()).await
    }

    /// Write raw bytes, overwriting any existing object at `key`.
    ///
    /// # Errors
    /// - Transport failure (`Write`)
    /// - Backend cannot write (`Unsupported`)
    async fn write_binary(&self, key: &BlobKey, content: Vec<u8>) -> Result<()>;

    /// Delete a single object.
    ///
    /// # Errors
    /// - Key absent (`NotFound`)
    /// - Backend cannot delete (`Unsupported`)
    async fn delete_file(&self, key: &BlobKey) -> Result<()>;

    /// List object keys under a logical root, recursively.
    ///
    /// `root` is relative to the configured folder; an empty root lists the
    /// whole folder. `extension` is a suffix match on the key. Returned keys
    /// are logical (folder prefix stripped) and never include the root.
    ///
    /// # Errors
    /// - Backend unreachable (`Connection`)
    async fn list_files(&self, root: &str, extension: Option<&str>) -> Result<Vec<String>>;

    /// List the groupings directly under a logical root.
    ///
    /// Entries are decorated as `{container}/{native key}/`; the root itself
    /// is never returned.
    ///
    /// # Errors
    /// - Backend unreachable (`Connection`)
    async fn list_containers(&self, root: &str) -> Result<Vec<String>>;

    /// Create a container.
    ///
    /// # Errors
    /// - No independent container concept (`Unsupported`)
    /// - Container exists (`AlreadyExists`)
    async fn create_container(&self, name: &str) -> Result<()>;

    /// Delete a container.
    ///
    /// # Errors
    /// - No independent container concept (`Unsupported`)
    /// - Container absent (`NotFound`)
    async fn delete_container(&self, name: &str) -> Result<()>;

    /// Discover typed assets in the configured container or in `container`.
    ///
    /// Objects whose type cannot be classified are left out, so the result
    /// may be empty.
    ///
    /// # Errors
    /// - Discovery not possible on this backend (`Unsupported`)
    /// - Backend unreachable (`Connection`)
    async fn get_assets(&self, container: Option<&str>) -> Result<Vec<Asset>>;
}

/// Validate a container name shared by all backends.
///
/// Names are single path segments; backends may apply stricter rules.
pub(crate) fn validate_container_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(
            "Container name cannot be empty".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(Error::InvalidInput(format!(
            "Invalid container name: {}",
            name
        )));
    }
    Ok(())
}
