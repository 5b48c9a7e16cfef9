//! Azure container REST client.
//!
//! OpenDAL's Azblob service covers blobs only; container create/delete go
//! through the Blob service REST API, authorized by the SAS token.

use reqwest::{header, Client, Method, StatusCode};
use url::Url;
use zeroize::Zeroize;

use assetstore_common::{Error, Result};

use crate::config::AzureOptions;

/// Azure container names: 3-63 characters, lowercase letters, digits and
/// single hyphens, starting and ending with a letter or digit.
pub fn validate_container_name(name: &str) -> Result<()> {
    let valid_chars = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    let valid = (3..=63).contains(&name.len())
        && valid_chars
        && !name.starts_with('-')
        && !name.ends_with('-')
        && !name.contains("--");

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "Invalid Azure container name: {}",
            name
        )))
    }
}

/// Client for container-level Blob service calls.
pub struct ContainerClient {
    http: Client,
    endpoint: Url,
    sas: String,
    version: String,
}

impl ContainerClient {
    /// Create a client for the account described by `options`.
    pub fn new(options: &AzureOptions) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("assetstore/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: options.endpoint_url()?,
            sas: options.sas_query().to_string(),
            version: options.service_version().to_string(),
        })
    }

    /// `{endpoint}/{name}?restype=container&{sas}`.
    pub fn container_url(&self, name: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Endpoint cannot hold a path: {}", self.endpoint)))?
            .pop_if_empty()
            .push(name);
        url.set_query(Some(&format!("restype=container&{}", self.sas)));
        Ok(url)
    }

    /// Create a container.
    ///
    /// # Errors
    /// - Container exists (`AlreadyExists`)
    /// - Rejected or unreachable (`Connection`)
    pub async fn create(&self, name: &str) -> Result<()> {
        let status = self.send(Method::PUT, name).await?;
        if status == StatusCode::CREATED {
            return Ok(());
        }
        Err(status_error(status, name))
    }

    /// Delete a container and every blob in it.
    ///
    /// # Errors
    /// - Container absent (`NotFound`)
    /// - Rejected or unreachable (`Connection`)
    pub async fn delete(&self, name: &str) -> Result<()> {
        let status = self.send(Method::DELETE, name).await?;
        if status == StatusCode::ACCEPTED {
            return Ok(());
        }
        Err(status_error(status, name))
    }

    async fn send(&self, method: Method, name: &str) -> Result<StatusCode> {
        let url = self.container_url(name)?;

        let response = self
            .http
            .request(method, url)
            .header("x-ms-version", &self.version)
            .header(header::CONTENT_LENGTH, "0")
            .send()
            .await
            .map_err(|e| Error::Connection(format!("Container request failed: {}", e)))?;

        Ok(response.status())
    }
}

impl Drop for ContainerClient {
    fn drop(&mut self) {
        self.sas.zeroize();
    }
}

/// Error for an unexpected container call status.
fn status_error(status: StatusCode, name: &str) -> Error {
    match status {
        StatusCode::CONFLICT => {
            Error::AlreadyExists(format!("Container already exists: {}", name))
        }
        StatusCode::NOT_FOUND => Error::NotFound(format!("Container not found: {}", name)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Connection(format!(
            "Container request for {} rejected ({}); check the SAS token permissions",
            name, status
        )),
        _ => Error::Connection(format!(
            "Unexpected status {} for container {}",
            status, name
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_url() {
        let options = AzureOptions::new("acct", "?sv=2023-11-03&sig=abc", "assets");
        let client = ContainerClient::new(&options).unwrap();
        assert_eq!(
            client.container_url("textures").unwrap().as_str(),
            "https://acct.blob.core.windows.net/textures?restype=container&sv=2023-11-03&sig=abc"
        );
    }

    #[test]
    fn test_container_url_with_emulator_endpoint() {
        let options = AzureOptions::new("devstoreaccount1", "sig=abc", "assets")
            .with_endpoint("http://127.0.0.1:10000/devstoreaccount1/");
        let client = ContainerClient::new(&options).unwrap();
        assert_eq!(
            client.container_url("textures").unwrap().as_str(),
            "http://127.0.0.1:10000/devstoreaccount1/textures?restype=container&sig=abc"
        );
    }

    #[test]
    fn test_status_error_mapping() {
        assert!(matches!(
            status_error(StatusCode::CONFLICT, "a"),
            Error::AlreadyExists(_)
        ));
        assert!(status_error(StatusCode::NOT_FOUND, "a").is_not_found());
        assert!(matches!(
            status_error(StatusCode::FORBIDDEN, "a"),
            Error::Connection(_)
        ));
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "a"),
            Error::Connection(_)
        ));
    }

    #[test]
    fn test_validate_container_name() {
        assert!(validate_container_name("textures-2024").is_ok());
        assert!(validate_container_name("ab").is_err());
        assert!(validate_container_name("Textures").is_err());
        assert!(validate_container_name("-textures").is_err());
        assert!(validate_container_name("tex--tures").is_err());
        assert!(validate_container_name(&"a".repeat(64)).is_err());
    }
}
