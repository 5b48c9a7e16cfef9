//! Storage provider abstraction for asset management.
//!
//! This module provides a trait-based interface over heterogeneous storage
//! backends (local filesystem, S3-compatible object stores, Azure blob
//! storage, in-memory) and a provider registry for dynamic provider
//! resolution.
//!
//! # Design Principles
//! - One contract: every backend implements [`StorageProvider`] and reports
//!   capability gaps as [`Error::Unsupported`](assetstore_common::Error)
//! - Explicit lifecycle: data operations fail with `NotReady` until
//!   `initialize()` has completed a real round-trip
//! - Lazy connections: each provider owns at most one client handle,
//!   created on first use
//! - Single point of key composition: backends translate keys only through
//!   their [`KeyNormalizer`]

pub mod adapter;
pub mod assets;
pub mod azblob;
pub mod config;
pub mod lifecycle;
pub mod listing;
pub mod local;
pub mod memory;
pub mod normalize;
pub mod operator;
pub mod provider;
pub mod registry;
pub mod s3;

pub use assets::{get_file_name, Asset, AssetClassifier, AssetType, MimeClassifier};
pub use azblob::AzureBlobProvider;
pub use config::{AzureOptions, LocalOptions, MemoryOptions, S3Options};
pub use lifecycle::ProviderState;
pub use listing::ListingEntry;
pub use local::LocalProvider;
pub use memory::MemoryProvider;
pub use normalize::KeyNormalizer;
pub use operator::OperatorFactory;
pub use provider::{BackendKind, Capabilities, StorageProvider};
pub use registry::{create_default_registry, ProviderFactory, ProviderRegistry};
pub use s3::S3Provider;
