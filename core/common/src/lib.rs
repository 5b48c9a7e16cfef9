//! Common utilities and types shared across the assetstore crates.
//!
//! This module provides the error taxonomy every storage backend reports
//! through, and the validated blob key type used to address stored objects.

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::BlobKey;
