//! CLI configuration file.

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Which backend to open and the options handed to its factory.
///
/// ```json
/// { "backend": "s3", "options": { "bucket": "assets", "region": "eu-west-1" } }
/// ```
#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub backend: String,
    #[serde(default)]
    pub options: Value,
}

impl CliConfig {
    /// `{config dir}/assetstore/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("assetstore").join("config.json"))
    }

    /// Read and parse a configuration file.
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}
