//! Object storage for generated portraits
//!
//! Uploads go to the Firebase Storage bucket through its S3-compatible XML
//! API, so the same client works against any S3-style endpoint.

pub mod client;
pub mod mock;

pub use client::StorageClient;
pub use mock::MockStorageClient;

use crate::Result;
use async_trait::async_trait;

#[async_trait]
pub trait StorageService: Send + Sync {
    /// Store `data` under `key`, readable by anyone, and return its public URL.
    async fn upload_public(&self, key: &str, data: &[u8], content_type: &str) -> Result<String>;
}

/// Public URL of an object in a path-style bucket.
pub fn public_url(base_url: &str, bucket: &str, key: &str) -> String {
    format!("{}/{}/{}", base_url.trim_end_matches('/'), bucket, key)
}
