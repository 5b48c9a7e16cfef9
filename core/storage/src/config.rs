//! Backend options.
//!
//! Options are deserialized from JSON, validated once when a provider is
//! constructed, and never mutated afterwards. Required string fields default
//! to empty so that `validate()` can name the missing field instead of
//! failing with a generic deserialization error.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use zeroize::Zeroize;

use assetstore_common::{Error, Result};

/// Value that selects the newest API version a backend speaks.
pub const LATEST_API_VERSION: &str = "latest";

/// The only S3 REST API version.
pub const S3_API_VERSION: &str = "2006-03-01";

/// Azure Storage service version used for "latest".
pub const AZURE_LATEST_API_VERSION: &str = "2023-11-03";

fn default_api_version() -> String {
    LATEST_API_VERSION.to_string()
}

fn default_memory_container() -> String {
    "assets".to_string()
}

fn require(field: &str, value: &str, backend: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Config(format!(
            "{} options require '{}'",
            backend, field
        )));
    }
    Ok(())
}

/// Options for the local filesystem backend.
#[derive(Debug, Clone, Deserialize)]
pub struct LocalOptions {
    /// Directory holding one sub-directory per container.
    #[serde(default)]
    pub root: PathBuf,
    /// Container directory under `root`.
    #[serde(default)]
    pub container: String,
    /// Logical prefix inside the container.
    #[serde(default)]
    pub folder: String,
}

impl LocalOptions {
    pub fn new(root: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            container: container.into(),
            folder: String::new(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::Config("local options require 'root'".to_string()));
        }
        require("container", &self.container, "local")
    }
}

/// Options for the in-memory backend.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryOptions {
    #[serde(default = "default_memory_container")]
    pub container: String,
    #[serde(default)]
    pub folder: String,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            container: default_memory_container(),
            folder: String::new(),
        }
    }
}

impl MemoryOptions {
    pub fn validate(&self) -> Result<()> {
        require("container", &self.container, "memory")
    }
}

/// Options for S3 and S3-compatible object stores.
#[derive(Clone, Deserialize)]
pub struct S3Options {
    #[serde(default)]
    pub bucket: String,
    #[serde(default)]
    pub folder: String,
    #[serde(default)]
    pub region: String,
    /// Custom endpoint for MinIO, R2 and similar; path-style URLs are used
    /// when set.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub access_key_id: String,
    #[serde(default)]
    pub secret_access_key: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl S3Options {
    pub fn new(
        bucket: impl Into<String>,
        region: impl Into<String>,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            folder: String::new(),
            region: region.into(),
            endpoint: None,
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            api_version: default_api_version(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require("bucket", &self.bucket, "s3")?;
        require("region", &self.region, "s3")?;
        require("access_key_id", &self.access_key_id, "s3")?;
        require("secret_access_key", &self.secret_access_key, "s3")?;

        if self.api_version != LATEST_API_VERSION && self.api_version != S3_API_VERSION {
            return Err(Error::Config(format!(
                "s3 only speaks API version {}, got '{}'",
                S3_API_VERSION, self.api_version
            )));
        }

        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("Invalid s3 endpoint '{}': {}", endpoint, e)))?;
        }
        Ok(())
    }
}

impl fmt::Debug for S3Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Options")
            .field("bucket", &self.bucket)
            .field("folder", &self.folder)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl Drop for S3Options {
    fn drop(&mut self) {
        self.secret_access_key.zeroize();
    }
}

/// Options for Azure Blob Storage.
///
/// Requests are authorized with a SAS token that must grant container
/// create/delete/list and blob read/write/delete.
#[derive(Clone, Deserialize)]
pub struct AzureOptions {
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub sas_token: String,
    #[serde(default)]
    pub container: String,
    #[serde(default)]
    pub folder: String,
    /// Defaults to `https://{account_name}.blob.core.windows.net`.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

impl AzureOptions {
    pub fn new(
        account_name: impl Into<String>,
        sas_token: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            account_name: account_name.into(),
            sas_token: sas_token.into(),
            container: container.into(),
            folder: String::new(),
            endpoint: None,
            api_version: default_api_version(),
        }
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = folder.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        require("account_name", &self.account_name, "azblob")?;
        require("sas_token", &self.sas_token, "azblob")?;
        require("container", &self.container, "azblob")?;
        require("api_version", &self.api_version, "azblob")?;
        self.endpoint_url().map(|_| ())
    }

    /// Service version sent as `x-ms-version`.
    pub fn service_version(&self) -> &str {
        if self.api_version == LATEST_API_VERSION {
            AZURE_LATEST_API_VERSION
        } else {
            &self.api_version
        }
    }

    /// Account endpoint, with any trailing `/` removed.
    pub fn endpoint_url(&self) -> Result<url::Url> {
        let raw = match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}.blob.core.windows.net", self.account_name),
        };
        url::Url::parse(&raw)
            .map_err(|e| Error::Config(format!("Invalid azblob endpoint '{}': {}", raw, e)))
    }

    /// SAS token without a leading `?`.
    pub fn sas_query(&self) -> &str {
        self.sas_token.trim_start_matches('?')
    }
}

impl fmt::Debug for AzureOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AzureOptions")
            .field("account_name", &self.account_name)
            .field("sas_token", &"[REDACTED]")
            .field("container", &self.container)
            .field("folder", &self.folder)
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl Drop for AzureOptions {
    fn drop(&mut self) {
        self.sas_token.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_defaults_api_version() {
        let options: S3Options = serde_json::from_value(serde_json::json!({
            "bucket": "assets",
            "region": "eu-west-1",
            "access_key_id": "AKIA",
            "secret_access_key": "secret"
        }))
        .unwrap();

        assert_eq!(options.api_version, "latest");
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_s3_missing_credential_is_config_error() {
        let options: S3Options = serde_json::from_value(serde_json::json!({
            "bucket": "assets",
            "region": "eu-west-1",
            "access_key_id": "AKIA"
        }))
        .unwrap();

        match options.validate() {
            Err(Error::Config(msg)) => assert!(msg.contains("secret_access_key")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_s3_missing_bucket_is_config_error() {
        let options = S3Options::new("", "eu-west-1", "AKIA", "secret");
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_s3_rejects_unknown_api_version() {
        let mut options = S3Options::new("assets", "eu-west-1", "AKIA", "secret");
        options.api_version = "2020-01-01".to_string();
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_secrets_are_redacted() {
        let s3 = S3Options::new("assets", "eu-west-1", "AKIA", "top-secret");
        assert!(!format!("{:?}", s3).contains("top-secret"));

        let azure = AzureOptions::new("acct", "sv=2023&sig=top-secret", "assets");
        assert!(!format!("{:?}", azure).contains("top-secret"));
    }

    #[test]
    fn test_azure_endpoint_and_version() {
        let options = AzureOptions::new("acct", "?sv=1&sig=x", "assets");
        assert!(options.validate().is_ok());
        assert_eq!(
            options.endpoint_url().unwrap().as_str(),
            "https://acct.blob.core.windows.net/"
        );
        assert_eq!(options.service_version(), AZURE_LATEST_API_VERSION);
        assert_eq!(options.sas_query(), "sv=1&sig=x");

        let custom = AzureOptions::new("devstoreaccount1", "sig=x", "assets")
            .with_endpoint("http://127.0.0.1:10000/devstoreaccount1/");
        assert_eq!(
            custom.endpoint_url().unwrap().as_str(),
            "http://127.0.0.1:10000/devstoreaccount1"
        );
    }

    #[test]
    fn test_azure_missing_sas_is_config_error() {
        let options = AzureOptions::new("acct", "", "assets");
        assert!(matches!(options.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_local_requires_root_and_container() {
        assert!(LocalOptions::new("", "assets").validate().is_err());
        assert!(LocalOptions::new("/tmp/x", "").validate().is_err());
        assert!(LocalOptions::new("/tmp/x", "assets").validate().is_ok());
    }

    #[test]
    fn test_memory_defaults() {
        let options: MemoryOptions = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(options.container, "assets");
        assert!(options.validate().is_ok());
    }
}
