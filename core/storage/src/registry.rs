//! Provider registry for dynamic provider resolution.

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use assetstore_common::{Error, Result};

use crate::azblob::AzureBlobProvider;
use crate::config::{AzureOptions, LocalOptions, MemoryOptions, S3Options};
use crate::local::LocalProvider;
use crate::memory::MemoryProvider;
use crate::provider::StorageProvider;
use crate::s3::S3Provider;

/// Factory function type for creating providers.
pub type ProviderFactory = Box<dyn Fn(Value) -> Result<Arc<dyn StorageProvider>> + Send + Sync>;

/// Registry for storage provider factories.
///
/// Allows dynamic registration and resolution of storage providers
/// by backend name and JSON options.
pub struct ProviderRegistry {
    factories: HashMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a provider factory.
    ///
    /// # Preconditions
    /// - `name` must be unique within the registry
    ///
    /// # Postconditions
    /// - Factory is registered and can be resolved by name
    ///
    /// # Errors
    /// - Name already registered (`AlreadyExists`)
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::AlreadyExists(format!(
                "Provider '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a provider by name and options.
    ///
    /// The returned provider is not initialized yet.
    ///
    /// # Errors
    /// - Provider not registered (`NotFound`)
    /// - Options malformed or incomplete (`Config`)
    pub fn resolve(&self, name: &str, options: Value) -> Result<Arc<dyn StorageProvider>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("Provider '{}' is not registered", name)))?;
        factory(options)
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort();
        names
    }

    /// Check if a provider is registered.
    pub fn has_provider(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Insert without the duplicate check.
    fn insert_builtin(&mut self, name: &str, factory: ProviderFactory) {
        self.factories.insert(name.to_string(), factory);
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Deserialize backend options; `null` means "all defaults".
fn parse_options<T: DeserializeOwned>(backend: &str, options: Value) -> Result<T> {
    let options = match options {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(options)
        .map_err(|e| Error::Config(format!("Invalid {} options: {}", backend, e)))
}

/// Create a registry with the built-in providers.
pub fn create_default_registry() -> ProviderRegistry {
    let mut registry = ProviderRegistry::new();

    registry.insert_builtin(
        "memory",
        Box::new(|options| {
            let options: MemoryOptions = parse_options("memory", options)?;
            Ok(Arc::new(MemoryProvider::new(options)?))
        }),
    );

    registry.insert_builtin(
        "local",
        Box::new(|options| {
            let options: LocalOptions = parse_options("local", options)?;
            Ok(Arc::new(LocalProvider::new(options)?))
        }),
    );

    registry.insert_builtin(
        "s3",
        Box::new(|options| {
            let options: S3Options = parse_options("s3", options)?;
            Ok(Arc::new(S3Provider::new(options)?))
        }),
    );

    registry.insert_builtin(
        "azblob",
        Box::new(|options| {
            let options: AzureOptions = parse_options("azblob", options)?;
            Ok(Arc::new(AzureBlobProvider::new(options)?))
        }),
    );

    registry
}
