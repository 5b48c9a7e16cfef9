//! Azure Blob Storage provider.
//!
//! Blob operations go through an OpenDAL `Azblob` operator; container
//! create/delete use the Blob service REST API directly.

mod client;
mod provider;

pub use client::{validate_container_name, ContainerClient};
pub use provider::{AzureBlobProvider, AzureConnection};
