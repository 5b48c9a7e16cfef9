//! In-memory storage provider for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

use assetstore_common::{BlobKey, Error, Result};

use crate::assets::{self, Asset, AssetClassifier, MimeClassifier};
use crate::config::MemoryOptions;
use crate::lifecycle::{Lifecycle, ProviderState};
use crate::listing::{self, ListingEntry};
use crate::normalize::KeyNormalizer;
use crate::provider::{validate_container_name, BackendKind, Capabilities, StorageProvider};

/// One stored object.
#[derive(Debug, Clone)]
struct MemoryObject {
    data: Vec<u8>,
    modified: DateTime<Utc>,
}

type Containers = BTreeMap<String, BTreeMap<String, MemoryObject>>;

/// Shared in-memory container map.
///
/// Cloning shares the underlying data, so several providers can observe the
/// same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    containers: Arc<RwLock<Containers>>,
}

impl MemoryStore {
    /// Create an empty store with no containers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding one empty container.
    pub fn with_container(name: &str) -> Self {
        let store = Self::new();
        store.write().insert(name.to_string(), BTreeMap::new());
        store
    }

    fn read(&self) -> RwLockReadGuard<'_, Containers> {
        self.containers.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Containers> {
        self.containers.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Names of all containers, sorted.
    pub fn container_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// Objects in a container under a native prefix, in key order.
    fn entries(&self, container: &str, prefix: &str) -> Result<Vec<ListingEntry>> {
        let containers = self.read();
        let objects = containers
            .get(container)
            .ok_or_else(|| Error::NotFound(format!("Container not found: {}", container)))?;

        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, object)| {
                ListingEntry::file(
                    key.clone(),
                    Some(object.data.len() as u64),
                    Some(object.modified),
                )
            })
            .collect())
    }
}

/// In-memory storage provider.
///
/// Useful for testing and development. All data is stored in memory
/// and lost when the last handle to the store is dropped. Keys are kept
/// sorted, so listings come back in lexicographic order.
pub struct MemoryProvider {
    normalizer: KeyNormalizer,
    store: MemoryStore,
    lifecycle: Lifecycle,
    classifier: Arc<dyn AssetClassifier>,
}

impl MemoryProvider {
    /// Create a provider over a fresh store holding the configured container.
    pub fn new(options: MemoryOptions) -> Result<Self> {
        options.validate()?;
        let store = MemoryStore::with_container(&options.container);
        Self::with_store(options, store)
    }

    /// Create a provider over an existing store.
    ///
    /// The configured container is not created; `initialize()` fails if it
    /// is missing.
    pub fn with_store(options: MemoryOptions, store: MemoryStore) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            normalizer: KeyNormalizer::new(options.container.as_str(), &options.folder),
            store,
            lifecycle: Lifecycle::new("memory"),
            classifier: Arc::new(MimeClassifier),
        })
    }

    /// Replace the asset classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn AssetClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    fn object_url(normalizer: &KeyNormalizer, native: &str) -> String {
        format!("memory://{}", normalizer.decorate(native))
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
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
                let scope = self.normalizer.scope("")?;
                self.store
                    .entries(self.normalizer.container(), &scope)
                    .map(|_| ())
            })
            .await
    }

    async fn read_binary(&self, key: &BlobKey) -> Result<Vec<u8>> {
        self.lifecycle.ensure_ready()?;
        let native = self.normalizer.to_native(key);
        let containers = self.store.read();

        containers
            .get(self.normalizer.container())
            .and_then(|objects| objects.get(&native))
            .map(|object| object.data.clone())
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", key)))
    }

    async fn write_binary(&self, key: &BlobKey, content: Vec<u8>) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        let native = self.normalizer.to_native(key);
        let mut containers = self.store.write();

        let objects = containers
            .get_mut(self.normalizer.container())
            .ok_or_else(|| {
                Error::Write(format!("Container vanished: {}", self.normalizer.container()))
            })?;
        objects.insert(
            native,
            MemoryObject {
                data: content,
                modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn delete_file(&self, key: &BlobKey) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        let native = self.normalizer.to_native(key);
        let mut containers = self.store.write();

        containers
            .get_mut(self.normalizer.container())
            .and_then(|objects| objects.remove(&native))
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("File not found: {}", key)))
    }

    async fn list_files(&self, root: &str, extension: Option<&str>) -> Result<Vec<String>> {
        self.lifecycle.ensure_ready()?;
        let scope = self.normalizer.scope(root)?;
        let entries = self
            .store
            .entries(self.normalizer.container(), &scope)
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(listing::shape(entries, &scope, extension)
            .into_iter()
            .filter_map(|entry| self.normalizer.to_logical(&entry.key))
            .collect())
    }

    async fn list_containers(&self, root: &str) -> Result<Vec<String>> {
        self.lifecycle.ensure_ready()?;
        let scope = self.normalizer.scope(root)?;
        let entries = self
            .store
            .entries(self.normalizer.container(), &scope)
            .map_err(|e| Error::Connection(e.to_string()))?;

        // The store is flat; directories are the distinct next segments.
        let mut directories: Vec<ListingEntry> = Vec::new();
        for entry in entries {
            let rest = &entry.key[scope.len()..];
            if let Some((segment, _)) = rest.split_once('/') {
                let dir = ListingEntry::directory(format!("{}{}", scope, segment));
                if directories.last() != Some(&dir) {
                    directories.push(dir);
                }
            }
        }

        Ok(listing::child_directories(directories, &scope)
            .into_iter()
            .map(|entry| self.normalizer.decorate(&entry.key))
            .collect())
    }

    async fn create_container(&self, name: &str) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        validate_container_name(name)?;

        let mut containers = self.store.write();
        if containers.contains_key(name) {
            return Err(Error::AlreadyExists(format!(
                "Container already exists: {}",
                name
            )));
        }
        containers.insert(name.to_string(), BTreeMap::new());
        debug!("Created memory container {}", name);
        Ok(())
    }

    async fn delete_container(&self, name: &str) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        validate_container_name(name)?;

        self.store
            .write()
            .remove(name)
            .map(|_| debug!("Deleted memory container {}", name))
            .ok_or_else(|| Error::NotFound(format!("Container not found: {}", name)))
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

        let scope = normalizer.scope("")?;
        let entries = listing::shape(self.store.entries(normalizer.container(), &scope)?, &scope, None);

        Ok(assets::discover(entries, self.classifier.as_ref(), |entry| {
            let key = normalizer.to_logical(&entry.key)?;
            Some((key, Self::object_url(&normalizer, &entry.key)))
        }))
    }
}
