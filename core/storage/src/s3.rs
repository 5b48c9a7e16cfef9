//! S3 and S3-compatible object store provider.

use async_trait::async_trait;
use opendal::layers::LoggingLayer;
use opendal::services::S3;
use opendal::Operator;
use std::sync::Arc;
use tracing::debug;

use assetstore_common::{BlobKey, Error, Result};

use crate::adapter::ClientAdapter;
use crate::assets::{self, Asset, AssetClassifier, MimeClassifier};
use crate::config::S3Options;
use crate::lifecycle::{Lifecycle, ProviderState};
use crate::listing;
use crate::normalize::KeyNormalizer;
use crate::operator::{self, Action, OperatorFactory};
use crate::provider::{validate_container_name, BackendKind, Capabilities, StorageProvider};

/// Build an OpenDAL S3 operator for `bucket`.
fn build_operator(options: &S3Options, bucket: &str) -> Result<Operator> {
    let mut builder = S3::default()
        .bucket(bucket)
        .region(&options.region)
        .access_key_id(&options.access_key_id)
        .secret_access_key(&options.secret_access_key);

    if let Some(endpoint) = &options.endpoint {
        builder = builder.endpoint(endpoint);
    }

    let op = Operator::new(builder)
        .map_err(|e| Error::Config(format!("Invalid s3 configuration: {}", e)))?
        .layer(LoggingLayer::default())
        .finish();
    Ok(op)
}

/// S3 storage provider.
///
/// The bucket is bound at construction, so container management is not
/// available; the rest of the contract maps onto one flat key space.
pub struct S3Provider {
    bucket: String,
    region: String,
    endpoint: Option<String>,
    normalizer: KeyNormalizer,
    lifecycle: Lifecycle,
    client: ClientAdapter<Operator>,
    factory: OperatorFactory,
    classifier: Arc<dyn AssetClassifier>,
}

impl S3Provider {
    /// Create a provider talking to S3 with the given options.
    ///
    /// # Errors
    /// - Missing bucket, region or credentials (`Config`)
    pub fn new(options: S3Options) -> Result<Self> {
        options.validate()?;
        let connect_options = options.clone();
        let factory: OperatorFactory =
            Arc::new(move |bucket: &str| build_operator(&connect_options, bucket));
        Ok(Self::assemble(&options, factory))
    }

    /// Create a provider whose operators come from `factory`.
    ///
    /// Useful for S3-compatible services that need extra builder settings.
    pub fn with_operator_factory(options: S3Options, factory: OperatorFactory) -> Result<Self> {
        options.validate()?;
        Ok(Self::assemble(&options, factory))
    }

    fn assemble(options: &S3Options, factory: OperatorFactory) -> Self {
        let bucket = options.bucket.clone();
        let connect = factory.clone();

        Self {
            bucket: bucket.clone(),
            region: options.region.clone(),
            endpoint: options
                .endpoint
                .as_ref()
                .map(|e| e.trim_end_matches('/').to_string()),
            normalizer: KeyNormalizer::new(bucket.as_str(), &options.folder),
            lifecycle: Lifecycle::new("s3"),
            client: ClientAdapter::new("s3", Box::new(move || connect(&bucket))),
            factory,
            classifier: Arc::new(MimeClassifier),
        }
    }

    /// Replace the asset classifier.
    pub fn with_classifier(mut self, classifier: Arc<dyn AssetClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Canonical URL of an object.
    ///
    /// Path-style under a custom endpoint, virtual-hosted style on AWS.
    pub fn object_url(&self, bucket: &str, native: &str) -> String {
        let path = operator::encode_key(native);
        match &self.endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint, bucket, path),
            None => format!("https://{}.s3.{}.amazonaws.com/{}", bucket, self.region, path),
        }
    }
}

#[async_trait]
impl StorageProvider for S3Provider {
    fn name(&self) -> &str {
        "s3"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::FlatObjectStore
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::full().without_containers()
    }

    fn state(&self) -> ProviderState {
        self.lifecycle.state()
    }

    async fn initialize(&self) -> Result<()> {
        self.lifecycle
            .initialize(|| async {
                let op = self.client.get().await?;
                operator::probe(op, &self.normalizer.scope("")?).await
            })
            .await
    }

    async fn read_binary(&self, key: &BlobKey) -> Result<Vec<u8>> {
        self.lifecycle.ensure_ready()?;
        let op = self.client.get().await?;
        let native = self.normalizer.to_native(key);

        let buffer = op
            .read(&native)
            .await
            .map_err(|e| operator::map_error(e, Action::Read, &native))?;
        Ok(buffer.to_vec())
    }

    async fn write_binary(&self, key: &BlobKey, content: Vec<u8>) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        let op = self.client.get().await?;
        let native = self.normalizer.to_native(key);

        op.write(&native, content)
            .await
            .map_err(|e| operator::map_error(e, Action::Write, &native))?;
        debug!("Wrote s3://{}/{}", self.bucket, native);
        Ok(())
    }

    async fn delete_file(&self, key: &BlobKey) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        let op = self.client.get().await?;
        operator::delete_existing(op, &self.normalizer.to_native(key)).await
    }

    async fn list_files(&self, root: &str, extension: Option<&str>) -> Result<Vec<String>> {
        self.lifecycle.ensure_ready()?;
        let op = self.client.get().await?;
        let scope = self.normalizer.scope(root)?;

        let entries = operator::list_entries(op, &scope, true).await?;
        Ok(listing::shape(entries, &scope, extension)
            .into_iter()
            .filter_map(|entry| self.normalizer.to_logical(&entry.key))
            .collect())
    }

    async fn list_containers(&self, root: &str) -> Result<Vec<String>> {
        self.lifecycle.ensure_ready()?;
        let op = self.client.get().await?;
        let scope = self.normalizer.scope(root)?;

        let entries = operator::list_entries(op, &scope, false).await?;
        Ok(listing::child_directories(entries, &scope)
            .into_iter()
            .map(|entry| self.normalizer.decorate(&entry.key))
            .collect())
    }

    async fn create_container(&self, _name: &str) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        Err(Error::unsupported("s3", "create_container"))
    }

    async fn delete_container(&self, _name: &str) -> Result<()> {
        self.lifecycle.ensure_ready()?;
        Err(Error::unsupported("s3", "delete_container"))
    }

    async fn get_assets(&self, container: Option<&str>) -> Result<Vec<Asset>> {
        self.lifecycle.ensure_ready()?;

        let (normalizer, transient) = match container {
            Some(bucket) if bucket != self.bucket => {
                validate_container_name(bucket)?;
                (self.normalizer.for_container(bucket), Some((self.factory)(bucket)?))
            }
            _ => (self.normalizer.clone(), None),
        };
        let op = match &transient {
            Some(op) => op,
            None => self.client.get().await?,
        };

        let scope = normalizer.scope("")?;
        let entries = operator::list_entries(op, &scope, true).await?;
        let entries = listing::shape(entries, &scope, None);

        Ok(assets::discover(entries, self.classifier.as_ref(), |entry| {
            let key = normalizer.to_logical(&entry.key)?;
            Some((key, self.object_url(normalizer.container(), &entry.key)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetType;
    use crate::operator::testing::memory_factory;

    fn key(s: &str) -> BlobKey {
        BlobKey::parse(s).unwrap()
    }

    fn options(folder: &str) -> S3Options {
        S3Options::new("assets", "eu-west-1", "AKIA", "secret").with_folder(folder)
    }

    async fn ready_provider(folder: &str, factory: OperatorFactory) -> S3Provider {
        let provider = S3Provider::with_operator_factory(options(folder), factory).unwrap();
        provider.initialize().await.unwrap();
        provider
    }

    #[test]
    fn test_s3_new_rejects_missing_bucket() {
        let options = S3Options::new("", "eu-west-1", "AKIA", "secret");
        assert!(matches!(S3Provider::new(options), Err(Error::Config(_))));
    }

    #[test]
    fn test_s3_new_is_lazy() {
        let provider = S3Provider::new(options("")).unwrap();
        assert!(!provider.client.is_connected());
        assert_eq!(provider.state(), ProviderState::Uninitialized);
    }

    #[tokio::test]
    async fn test_s3_not_ready_before_initialize() {
        let provider = S3Provider::with_operator_factory(options(""), memory_factory()).unwrap();
        assert!(matches!(
            provider.list_files("", None).await,
            Err(Error::NotReady(_))
        ));
        assert!(!provider.client.is_connected());
    }

    #[tokio::test]
    async fn test_s3_failed_connector_fails_initialize() {
        let factory: OperatorFactory = Arc::new(|_: &str| -> Result<Operator> {
            Err(Error::Connection("unreachable".to_string()))
        });
        let provider = S3Provider::with_operator_factory(options(""), factory).unwrap();

        assert!(matches!(provider.initialize().await, Err(Error::Connection(_))));
        assert_eq!(provider.state(), ProviderState::Failed);
    }

    #[tokio::test]
    async fn test_s3_read_write_delete() {
        let provider = ready_provider("game", memory_factory()).await;
        let data = vec![0u8, 159, 146, 150, 255];

        provider.write_binary(&key("bin/raw"), data.clone()).await.unwrap();
        assert_eq!(provider.read_binary(&key("bin/raw")).await.unwrap(), data);
        assert!(matches!(
            provider.read_text(&key("bin/raw")).await,
            Err(Error::Read(_))
        ));

        provider.delete_file(&key("bin/raw")).await.unwrap();
        assert!(matches!(
            provider.read_binary(&key("bin/raw")).await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            provider.delete_file(&key("bin/raw")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_s3_list_files_strips_folder() {
        let factory = memory_factory();
        let provider = ready_provider("game", factory.clone()).await;

        provider.write_text(&key("a.png"), "1").await.unwrap();
        provider.write_text(&key("img/b.png"), "2").await.unwrap();
        provider.write_text(&key("img/c.json"), "3").await.unwrap();
        factory("assets")
            .unwrap()
            .write("other/d.png", vec![1u8])
            .await
            .unwrap();

        let mut all = provider.list_files("", None).await.unwrap();
        all.sort();
        assert_eq!(all, vec!["a.png", "img/b.png", "img/c.json"]);
        assert_eq!(
            provider.list_files("img", Some(".json")).await.unwrap(),
            vec!["img/c.json"]
        );
    }

    #[tokio::test]
    async fn test_s3_list_containers() {
        let provider = ready_provider("game", memory_factory()).await;
        provider.write_text(&key("img/a.png"), "1").await.unwrap();
        provider.write_text(&key("sfx/b.wav"), "1").await.unwrap();
        provider.write_text(&key("top.txt"), "1").await.unwrap();

        let mut dirs = provider.list_containers("").await.unwrap();
        dirs.sort();
        assert_eq!(dirs, vec!["assets/game/img/", "assets/game/sfx/"]);
    }

    #[tokio::test]
    async fn test_s3_container_management_unsupported() {
        let provider = ready_provider("", memory_factory()).await;
        assert!(!provider.capabilities().manage_containers);

        let err = provider.create_container("other").await.unwrap_err();
        assert!(err.is_unsupported());
        let err = provider.delete_container("other").await.unwrap_err();
        assert!(err.is_unsupported());
    }

    #[tokio::test]
    async fn test_s3_get_assets_urls() {
        let factory = memory_factory();
        let provider = ready_provider("game", factory.clone()).await;
        provider.write_text(&key("img/hero one.png"), "1").await.unwrap();
        provider.write_text(&key("data.bin123"), "1").await.unwrap();

        let assets = provider.get_assets(None).await.unwrap();
        assert_eq!(assets.len(), 1);
        assert_eq!(assets[0].key, "img/hero one.png");
        assert_eq!(
            assets[0].url,
            "https://assets.s3.eu-west-1.amazonaws.com/game/img/hero%20one.png"
        );
        assert_eq!(assets[0].file_name, "hero%20one.png");
        assert_eq!(assets[0].asset_type, AssetType::Image);

        factory("archive")
            .unwrap()
            .write("game/old.mp3", vec![1u8])
            .await
            .unwrap();
        let archived = provider.get_assets(Some("archive")).await.unwrap();
        assert_eq!(archived.len(), 1);
        assert_eq!(archived[0].asset_type, AssetType::Audio);
        assert!(archived[0].url.starts_with("https://archive.s3."));
    }

    #[test]
    fn test_s3_path_style_url_with_endpoint() {
        let options = options("").with_endpoint("http://localhost:9000/");
        let provider = S3Provider::with_operator_factory(options, memory_factory()).unwrap();
        assert_eq!(
            provider.object_url("assets", "a/b.png"),
            "http://localhost:9000/assets/a/b.png"
        );
    }
}
