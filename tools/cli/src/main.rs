//! Assetstore CLI - command line access to storage providers.
//!
//! Opens the backend named in a JSON config file and runs one provider
//! operation against it.

mod config;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use assetstore_common::BlobKey;
use assetstore_storage::{create_default_registry, StorageProvider};

use crate::config::CliConfig;

#[derive(Parser)]
#[command(name = "assetstore")]
#[command(about = "Assetstore - Read, write and discover assets across storage backends")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Backend configuration file (default: <config dir>/assetstore/config.json).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered backends.
    Backends,

    /// List files recursively under a root.
    Ls {
        /// Root relative to the configured folder (default: whole folder).
        #[arg(default_value = "")]
        root: String,

        /// Only keys ending with this suffix, e.g. ".png".
        #[arg(short, long)]
        ext: Option<String>,
    },

    /// List the groupings directly under a root.
    Containers {
        #[arg(default_value = "")]
        root: String,
    },

    /// Print a text object.
    Cat { key: String },

    /// Download an object to a local file.
    Get { key: String, dest: PathBuf },

    /// Upload a local file.
    Put { source: PathBuf, key: String },

    /// Delete an object.
    Rm { key: String },

    /// Create a container.
    Mb { name: String },

    /// Delete a container and everything in it.
    Rb { name: String },

    /// Discover typed assets.
    Assets {
        /// Container to scan instead of the configured one.
        #[arg(long)]
        container: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Backends = cli.command {
        return cmd_backends();
    }

    let provider = open_provider(cli.config.as_deref()).await?;

    match cli.command {
        Commands::Backends => cmd_backends(),
        Commands::Ls { root, ext } => cmd_ls(provider.as_ref(), &root, ext.as_deref()).await,
        Commands::Containers { root } => cmd_containers(provider.as_ref(), &root).await,
        Commands::Cat { key } => cmd_cat(provider.as_ref(), &key).await,
        Commands::Get { key, dest } => cmd_get(provider.as_ref(), &key, &dest).await,
        Commands::Put { source, key } => cmd_put(provider.as_ref(), &source, &key).await,
        Commands::Rm { key } => cmd_rm(provider.as_ref(), &key).await,
        Commands::Mb { name } => cmd_mb(provider.as_ref(), &name).await,
        Commands::Rb { name } => cmd_rb(provider.as_ref(), &name).await,
        Commands::Assets { container, json } => {
            cmd_assets(provider.as_ref(), container.as_deref(), json).await
        }
    }
}

/// Resolve the configured backend and initialize it.
async fn open_provider(config_path: Option<&Path>) -> Result<Arc<dyn StorageProvider>> {
    let path = match config_path {
        Some(path) => path.to_path_buf(),
        None => CliConfig::default_path()
            .ok_or_else(|| anyhow!("No config directory on this platform; pass --config"))?,
    };
    let config = CliConfig::load(&path).await?;
    debug!("Using {} backend from {}", config.backend, path.display());

    let registry = create_default_registry();
    let provider = registry
        .resolve(&config.backend, config.options)
        .with_context(|| format!("Failed to create {} provider", config.backend))?;

    provider
        .initialize()
        .await
        .with_context(|| format!("Failed to connect to {} backend", config.backend))?;

    Ok(provider)
}

fn parse_key(key: &str) -> Result<BlobKey> {
    BlobKey::parse(key).with_context(|| format!("Invalid key: {}", key))
}

/// List the registered backends.
fn cmd_backends() -> Result<()> {
    for name in create_default_registry().providers() {
        println!("{}", name);
    }
    Ok(())
}

/// List files under a root.
async fn cmd_ls(provider: &dyn StorageProvider, root: &str, ext: Option<&str>) -> Result<()> {
    let keys = provider
        .list_files(root, ext)
        .await
        .context("Failed to list files")?;

    if keys.is_empty() {
        println!("No files.");
    }
    for key in keys {
        println!("{}", key);
    }
    Ok(())
}

/// List groupings under a root.
async fn cmd_containers(provider: &dyn StorageProvider, root: &str) -> Result<()> {
    let groups = provider
        .list_containers(root)
        .await
        .context("Failed to list containers")?;

    for group in groups {
        println!("  [DIR]  {}", group);
    }
    Ok(())
}

/// Print a text object.
async fn cmd_cat(provider: &dyn StorageProvider, key: &str) -> Result<()> {
    let text = provider
        .read_text(&parse_key(key)?)
        .await
        .with_context(|| format!("Failed to read {}", key))?;
    print!("{}", text);
    Ok(())
}

/// Download an object.
async fn cmd_get(provider: &dyn StorageProvider, key: &str, dest: &Path) -> Result<()> {
    info!("Downloading {} to {}", key, dest.display());

    let content = provider
        .read_binary(&parse_key(key)?)
        .await
        .with_context(|| format!("Failed to read {}", key))?;

    tokio::fs::write(dest, &content)
        .await
        .context("Failed to write output file")?;

    println!(
        "Downloaded {} to {} ({} bytes)",
        key,
        dest.display(),
        content.len()
    );
    Ok(())
}

/// Upload a file.
async fn cmd_put(provider: &dyn StorageProvider, source: &Path, key: &str) -> Result<()> {
    info!("Uploading {} as {}", source.display(), key);

    let content = tokio::fs::read(source)
        .await
        .context("Failed to read source file")?;
    let size = content.len();

    provider
        .write_binary(&parse_key(key)?, content)
        .await
        .with_context(|| format!("Failed to write {}", key))?;

    println!("Uploaded {} ({} bytes)", key, size);
    Ok(())
}

/// Delete an object.
async fn cmd_rm(provider: &dyn StorageProvider, key: &str) -> Result<()> {
    provider
        .delete_file(&parse_key(key)?)
        .await
        .with_context(|| format!("Failed to delete {}", key))?;
    println!("Deleted {}", key);
    Ok(())
}

/// Create a container.
async fn cmd_mb(provider: &dyn StorageProvider, name: &str) -> Result<()> {
    if !provider.capabilities().manage_containers {
        return Err(anyhow!(
            "The {} backend cannot create containers",
            provider.name()
        ));
    }
    provider
        .create_container(name)
        .await
        .with_context(|| format!("Failed to create container {}", name))?;
    println!("Created container {}", name);
    Ok(())
}

/// Delete a container.
async fn cmd_rb(provider: &dyn StorageProvider, name: &str) -> Result<()> {
    if !provider.capabilities().manage_containers {
        return Err(anyhow!(
            "The {} backend cannot delete containers",
            provider.name()
        ));
    }
    provider
        .delete_container(name)
        .await
        .with_context(|| format!("Failed to delete container {}", name))?;
    println!("Deleted container {}", name);
    Ok(())
}

/// Discover assets.
async fn cmd_assets(
    provider: &dyn StorageProvider,
    container: Option<&str>,
    json: bool,
) -> Result<()> {
    let assets = provider
        .get_assets(container)
        .await
        .context("Failed to discover assets")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&assets)?);
        return Ok(());
    }

    if assets.is_empty() {
        println!("No assets found.");
    }
    for asset in assets {
        let size = asset.size.map(|s| format!("{} bytes", s)).unwrap_or_default();
        println!("  [{:<8}] {} ({})", asset.asset_type.to_string(), asset.key, size);
        println!("             {}", asset.url);
    }
    Ok(())
}
