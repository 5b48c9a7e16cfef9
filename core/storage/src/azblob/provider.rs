//! Azure Blob Storage provider implementation.

use async_trait::async_trait;
use opendal::layers::LoggingLayer;
use opendal::services::Azblob;
use opendal::Operator;
use std::sync::Arc;
use tracing::{debug, info};

use assetstore_common::{BlobKey, Error, Result};

use super::client::{validate_container_name, ContainerClient};
use crate::adapter::ClientAdapter;
use crate::assets::{self, Asset, AssetClassifier, MimeClassifier};
use crate::config::AzureOptions;
use crate::lifecycle::{Lifecycle, ProviderState};
use crate::listing;
use crate::normalize::KeyNormalizer;
use crate::operator::{self, Action, OperatorFactory};
use crate::provider::{BackendKind, Capabilities, StorageProvider};

/// Build an OpenDAL Azblob operator for `container`.
fn build_operator(options: &AzureOptions, container: &str) -> Result<Operator> {
    let endpoint = options.endpoint_url()?;
    let builder = Azblob::default()
        .container(container)
        .endpoint(endpoint.as_str().trim_end_matches('/'))
        .account_name(&options.account_name)
        .sas_token(options.sas_query());

    let op = Operator::new(builder)
        .map_err(|e| Error::Config(format!("Invalid azblob configuration: {}", e)))?
        .layer(LoggingLayer::default())
        .finish();
    Ok(op)
}

/// Connection handle: blob operator plus the container REST client.
pub struct AzureConnection {
    blobs: Operator,
    containers: ContainerClient,
}

/// Azure Blob Storage provider.
///
/// Two-tier: the account holds independently managed containers, and the
/// configured container holds the blobs this provider reads and writes.
pub struct AzureBlobProvider {
    account_url: String,
    normalizer: KeyNormalizer,
    lifecycle: Lifecycle,
    client: ClientAdapter<AzureConnection>,
    factory: OperatorFactory,
    classifier: Arc<dyn AssetClassifier>,
}

impl AzureBlobProvider {
    /// Create a new Azure provider.
    ///
    /// # Errors
    /// - Missing account, SAS token or container, or a bad endpoint (`Config`)
    pub fn new(options: AzureOptions) -> Result<Self> {
        let blob_options = options.clone();
        let factory: OperatorFactory =
            Arc::new(move |container: &str| build_operator(&blob_options, container));
        Self::with_operator_factory(options, factory)
    }

    /// Create a provider whose blob operators come from `factory`.
    ///
    /// Container calls still go to the configured endpoint.
    pub fn with_operator_factory(options: AzureOptions, factory: OperatorFactory) -> Result<Self> {
        options.validate()?;

        let account_url = options.endpoint_url()?.as_str().trim_end_matches('/').to_string();
        let container = options.container.clone();
        let connect = factory.clone();
        let connect_options = options.clone();

        Ok(Self {
            account_url,
            normalizer: KeyNormalizer::new(container.as_str(), &options.folder),
            lifecycle: Lifecycle::new("azblob"),
            client: ClientAdapter::new(
                "azblob",
                Box::new(move || {
                    Ok(AzureConnection {
                        blobs: connect(&container)?,
                        containers: ContainerClient::new(&connect_options)?,
                    })
                }),
            ),
            factory,
            classifier: Arc::new(MimeClassifier),
        })
    }

    /// Replace the asset classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn AssetClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// `{endpoint}/{container}/{blob}`.
    pub fn blob_url(&self, container: &str, native: &str) -> String {
        format!(
            "{}/{}/{}",
            self.account_url,
            container,
            operator::encode_key(native)
        )
    }

    async fn blobs(&self) -> Result<&Operator> {
        Ok(&self.client.get().await?.blobs)
    }
}

#[async_trait]
impl StorageProvider for AzureBlobProvider {
    fn name(&self) -> &str {
        "azblob"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::TwoTierBlobStore
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
                let op = self.blobs().await?;
                operator::probe(op, &self.normalizer.scope("")?).await
            })
            .await
    }

    async fn read_binary(&self, key: &BlobKey) -> Result<Vec<u8>> {
        self.lifecycle.ensure_ready()?;
        let op = self.blobs().await?;
        let native = self.normalizer.to_native(key);

        let buffer = op
            .read(&native)
            .await
            .map_err(|e| operator::map_error(e, Action::Read, &native))?;
        Ok(buffer.to_vec())
    }

    async fn write_binary(&self, key: &BlobKey, content: Vec<u8>) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        let op = self.blobs().await?;
        let native = self.normalizer.to_native(key);

        op.write(&native, content)
            .await
            .map_err(|e| operator::map_error(e, Action::Write, &native))?;
        debug!("Wrote blob {}", self.normalizer.decorate(&native));
        Ok(())
    }

    async fn delete_file(&self, key: &BlobKey) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        let op = self.blobs().await?;
        operator::delete_existing(op, &self.normalizer.to_native(key)).await
    }

    async fn list_files(&self, root: &str, extension: Option<&str>) -> Result<Vec<String>> {
        self.lifecycle.ensure_ready()?;
        let op = self.blobs().await?;
        let scope = self.normalizer.scope(root)?;

        let entries = operator::list_entries(op, &scope, true).await?;
        Ok(listing::shape(entries, &scope, extension)
            .into_iter()
            .filter_map(|entry| self.normalizer.to_logical(&entry.key))
            .collect())
    }

    async fn list_containers(&self, root: &str) -> Result<Vec<String>> {
        self.lifecycle.ensure_ready()?;
        let op = self.blobs().await?;
        let scope = self.normalizer.scope(root)?;

        let entries = operator::list_entries(op, &scope, false).await?;
        Ok(listing::child_directories(entries, &scope)
            .into_iter()
            .map(|entry| self.normalizer.decorate(&entry.key))
            .collect())
    }

    async fn create_container(&self, name: &str) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        validate_container_name(name)?;

        self.client.get().await?.containers.create(name).await?;
        info!("Created Azure container {}", name);
        Ok(())
    }

    async fn delete_container(&self, name: &str) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        validate_container_name(name)?;

        self.client.get().await?.containers.delete(name).await?;
        info!("Deleted Azure container {}", name);
        Ok(())
    }

    async fn get_assets(&self, container: Option<&str>) -> Result<Vec<Asset>> {
        self.lifecycle.ensure_ready()?;

        let (normalizer, transient) = match container {
            Some(name) if name != self.normalizer.container() => {
                validate_container_name(name)?;
                (self.normalizer.for_container(name), Some((self.factory)(name)?))
            }
            _ => (self.normalizer.clone(), None),
        };
        let op = match &transient {
            Some(op) => op,
            None => self.blobs().await?,
        };

        let scope = normalizer.scope("")?;
        let entries = operator::list_entries(op, &scope, true).await?;
        let entries = listing::shape(entries, &scope, None);

        Ok(assets::discover(entries, self.classifier.as_ref(), |entry| {
            let key = normalizer.to_logical(&entry.key)?;
            Some((key, self.blob_url(normalizer.container(), &entry.key)))
        }))
    }
}
