//! Local filesystem storage provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

use assetstore_common::{BlobKey, Error, Result};

use crate::assets::{self, Asset, AssetClassifier, MimeClassifier};
use crate::config::LocalOptions;
use crate::lifecycle::{Lifecycle, ProviderState};
use crate::listing::{self, ListingEntry};
use crate::normalize::KeyNormalizer;
use crate::provider::{validate_container_name, BackendKind, Capabilities, StorageProvider};

/// Local filesystem storage provider.
///
/// Containers are directories under the configured root; keys map to files
/// below `{root}/{container}/{folder}`. Listings follow `read_dir` order,
/// which is filesystem-defined.
pub struct LocalProvider {
    root: PathBuf,
    normalizer: KeyNormalizer,
    lifecycle: Lifecycle,
    classifier: Arc<dyn AssetClassifier>,
}

impl LocalProvider {
    /// Create a new local provider.
    ///
    /// # Preconditions
    /// - Options name a root and a container
    ///
    /// # Postconditions
    /// - No filesystem access has happened yet
    ///
    /// # Errors
    /// - Missing root or container (`Config`)
    pub fn new(options: LocalOptions) -> Result<Self> {
        options.validate()?;
        let root = std::path::absolute(&options.root)?;

        Ok(Self {
            root,
            normalizer: KeyNormalizer::new(options.container.as_str(), &options.folder),
            lifecycle: Lifecycle::new("local"),
            classifier: Arc::new(MimeClassifier),
        })
    }

    /// Replace the asset classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn AssetClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    fn container_dir(&self, container: &str) -> PathBuf {
        self.root.join(container)
    }

    /// Convert a native key to a filesystem path inside a container.
    fn to_fs_path(&self, container: &str, native: &str) -> PathBuf {
        let mut fs_path = self.container_dir(container);
        for segment in native.split('/').filter(|s| !s.is_empty()) {
            fs_path.push(segment);
        }
        fs_path
    }

    /// Convert a filesystem path back to a native key.
    fn to_native(container_dir: &Path, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(container_dir).ok()?;
        let segments: Option<Vec<&str>> =
            relative.components().map(|c| c.as_os_str().to_str()).collect();
        Some(segments?.join("/"))
    }

    /// Recursively enumerate everything below `start`.
    ///
    /// A missing `start` yields an empty listing, as an object store would.
    async fn walk(&self, container_dir: &Path, start: PathBuf) -> Result<Vec<ListingEntry>> {
        let mut entries = Vec::new();
        let mut pending = vec![start.clone()];

        while let Some(dir) = pending.pop() {
            let mut reader = match fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(e) if e.kind() == ErrorKind::NotFound && dir == start => break,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = reader.next_entry().await? {
                let path = entry.path();
                let Some(native) = Self::to_native(container_dir, &path) else {
                    warn!("Skipping non UTF-8 path {}", path.display());
                    continue;
                };

                let fs_meta = entry.metadata().await?;
                if fs_meta.is_dir() {
                    entries.push(ListingEntry::directory(native));
                    pending.push(path);
                } else {
                    let modified: Option<DateTime<Utc>> = fs_meta.modified().ok().map(Into::into);
                    entries.push(ListingEntry::file(native, Some(fs_meta.len()), modified));
                }
            }
        }

        Ok(entries)
    }

    fn file_url(path: &Path) -> Option<String> {
        url::Url::from_file_path(path).ok().map(|url| url.to_string())
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::LocalFilesystem
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    fn state(&self) -> ProviderState {
        self.lifecycle.state()
    }

    async fn initialize(&self) -> Result<()> {
        self.lifecycle
            .initialize(|| async {
                let dir = self.container_dir(self.normalizer.container());
                let mut reader = fs::read_dir(&dir).await.map_err(|e| {
                    Error::Connection(format!("Cannot open {}: {}", dir.display(), e))
                })?;
                reader.next_entry().await?;
                Ok(())
            })
            .await
    }

    async fn read_binary(&self, key: &BlobKey) -> Result<Vec<u8>> {
        self.lifecycle.ensure_ready()?;
        let fs_path = self.to_fs_path(self.normalizer.container(), &self.normalizer.to_native(key));

        fs::read(&fs_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(format!("File not found: {}", key)),
            _ => Error::Read(format!("Failed to read {}: {}", key, e)),
        })
    }

    async fn write_binary(&self, key: &BlobKey, content: Vec<u8>) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        let fs_path = self.to_fs_path(self.normalizer.container(), &self.normalizer.to_native(key));

        if let Some(parent) = fs_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Write(format!("Failed to create parent of {}: {}", key, e)))?;
        }

        fs::write(&fs_path, &content)
            .await
            .map_err(|e| Error::Write(format!("Failed to write {}: {}", key, e)))
    }

    async fn delete_file(&self, key: &BlobKey) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        let fs_path = self.to_fs_path(self.normalizer.container(), &self.normalizer.to_native(key));

        if fs_path.is_dir() {
            return Err(Error::NotFound(format!("Not a file: {}", key)));
        }

        fs::remove_file(&fs_path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(format!("File not found: {}", key)),
            _ => Error::Io(e),
        })
    }

    async fn list_files(&self, root: &str, extension: Option<&str>) -> Result<Vec<String>> {
        self.lifecycle.ensure_ready()?;
        let container = self.normalizer.container();
        let scope = self.normalizer.scope(root)?;

        let entries = self
            .walk(&self.container_dir(container), self.to_fs_path(container, &scope))
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(listing::shape(entries, &scope, extension)
            .into_iter()
            .filter_map(|entry| self.normalizer.to_logical(&entry.key))
            .collect())
    }

    async fn list_containers(&self, root: &str) -> Result<Vec<String>> {
        self.lifecycle.ensure_ready()?;
        let container = self.normalizer.container();
        let container_dir = self.container_dir(container);
        let scope = self.normalizer.scope(root)?;

        let mut entries = Vec::new();
        match fs::read_dir(self.to_fs_path(container, &scope)).await {
            Ok(mut reader) => {
                while let Some(entry) = reader.next_entry().await? {
                    if !entry.file_type().await?.is_dir() {
                        continue;
                    }
                    if let Some(native) = Self::to_native(&container_dir, &entry.path()) {
                        entries.push(ListingEntry::directory(native));
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Connection(e.to_string())),
        }

        Ok(listing::child_directories(entries, &scope)
            .into_iter()
            .map(|entry| self.normalizer.decorate(&entry.key))
            .collect())
    }

    async fn create_container(&self, name: &str) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        validate_container_name(name)?;

        fs::create_dir(self.container_dir(name))
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::AlreadyExists => {
                    Error::AlreadyExists(format!("Container already exists: {}", name))
                }
                _ => Error::Io(e),
            })?;
        debug!("Created container directory {}", name);
        Ok(())
    }

    async fn delete_container(&self, name: &str) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        validate_container_name(name)?;

        let dir = self.container_dir(name);
        if !dir.is_dir() {
            return Err(Error::NotFound(format!("Container not found: {}", name)));
        }

        fs::remove_dir_all(&dir).await?;
        debug!("Deleted container directory {}", name);
        Ok(())
    }

    async fn get_assets(&self, container: Option<&str>) -> Result<Vec<Asset>> {
        self.lifecycle.ensure_ready()?;
        let normalizer = match container {
            Some(name) => {
                validate_container_name(name)?;
                self.normalizer.for_container(name)
            }
            None => self.normalizer.clone(),
        };

        let container_dir = self.container_dir(normalizer.container());
        if !container_dir.is_dir() {
            return Err(Error::NotFound(format!(
                "Container not found: {}",
                normalizer.container()
            )));
        }

        let scope = normalizer.scope("")?;
        let entries = self
            .walk(&container_dir, self.to_fs_path(normalizer.container(), &scope))
            .await?;
        let entries = listing::shape(entries, &scope, None);

        Ok(assets::discover(entries, self.classifier.as_ref(), |entry| {
            let key = normalizer.to_logical(&entry.key)?;
            let url = Self::file_url(&self.to_fs_path(normalizer.container(), &entry.key))?;
            Some((key, url))
        }))
    }
}
