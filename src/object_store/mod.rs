mod gcs;
mod local;

pub use gcs::GcsStore;
pub use local::LocalStore;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Object not found: {0}")]
    NotFound(String),
    #[error("Invalid object key: {0}")]
    InvalidKey(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// One level of a prefix listing.
///
/// `items` are full keys of the objects directly under the prefix; `prefixes`
/// are full keys of the nested "directories", each ending in `/`. Both keep
/// the backend's order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub items: Vec<String>,
    pub prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectMetadata {
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

/// Abstraction over blob storage backends.
/// Keys are `/`-separated paths such as `Files/{uid}/Docs/report.pdf`.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError>;
    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError>;
    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError>;
    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError>;
    async fn list(&self, prefix: &str) -> Result<Listing, ObjectStoreError>;
    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, ObjectStoreError>;
    /// A URL a client can fetch the object's bytes from.
    async fn download_url(&self, key: &str) -> Result<String, ObjectStoreError>;
}

/// Last `/`-separated segment of a key, ignoring a trailing slash.
pub fn key_name(key: &str) -> &str {
    let trimmed = key.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

#[cfg(test)]
mod tests {
    use super::key_name;

    #[test]
    fn test_key_name() {
        assert_eq!(key_name("Files/u1/Docs/"), "Docs");
        assert_eq!(key_name("Files/u1/a.pdf"), "a.pdf");
        assert_eq!(key_name("plain"), "plain");
    }
}
