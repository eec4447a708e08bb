use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Url;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{Listing, ObjectMetadata, ObjectStore, ObjectStoreError};

/// Root directory holding declared content types, one small file per key.
const CONTENT_TYPES_DIR: &str = ".content-types";

/// Local filesystem object store for development and testing.
///
/// Keys map to nested paths under `base_path`. A content type passed to `put`
/// is kept under `.content-types/{key}`; objects stored without one fall back
/// to a guess from the extension. Download URLs point at the `/static/*key`
/// route of this service.
pub struct LocalStore {
    base_path: PathBuf,
    public_base_url: Url,
}

impl LocalStore {
    pub fn new<P: AsRef<Path>>(base_path: P, public_base_url: &str) -> Result<Self, std::io::Error> {
        let public_base_url = Url::parse(public_base_url)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidInput, e))?;
        let base_path = base_path.as_ref().to_path_buf();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self {
            base_path,
            public_base_url,
        })
    }

    fn relative_key<'a>(&self, key: &'a str) -> Result<&'a str, ObjectStoreError> {
        let trimmed = key.trim_start_matches('/');
        let mut segments = trimmed.split('/');
        if segments.clone().next() == Some(CONTENT_TYPES_DIR)
            || segments.any(|segment| segment == ".." || segment == ".")
        {
            return Err(ObjectStoreError::InvalidKey(key.to_string()));
        }
        Ok(trimmed)
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        Ok(self.base_path.join(self.relative_key(key)?))
    }

    fn content_type_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        Ok(self
            .base_path
            .join(CONTENT_TYPES_DIR)
            .join(self.relative_key(key)?))
    }
}

async fn remove_if_present(path: &Path) -> Result<(), std::io::Error> {
    match tokio::fs::remove_file(path).await {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;

        let type_path = self.content_type_path(key)?;
        match content_type {
            Some(content_type) => {
                if let Some(parent) = type_path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&type_path, content_type).await?;
            }
            None => remove_if_present(&type_path).await?,
        }
        tracing::debug!(key, bytes = data.len(), "Stored object");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let data = tokio::fs::read(&path).await?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let path = self.object_path(key)?;
        if path.is_file() {
            tokio::fs::remove_file(&path).await?;
        }
        remove_if_present(&self.content_type_path(key)?).await?;
        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        let path = self.object_path(key)?;
        Ok(path.is_file())
    }

    async fn list(&self, prefix: &str) -> Result<Listing, ObjectStoreError> {
        let dir = self.object_path(prefix)?;
        if !dir.is_dir() {
            return Ok(Listing::default());
        }

        let key_prefix = if prefix.is_empty() || prefix.ends_with('/') {
            prefix.to_string()
        } else {
            format!("{prefix}/")
        };

        let mut files = Vec::new();
        let mut dirs = Vec::new();
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if key_prefix.is_empty() && name == CONTENT_TYPES_DIR {
                continue;
            }
            if entry.file_type().await?.is_dir() {
                dirs.push(name);
            } else {
                files.push(name);
            }
        }

        // Match the lexicographic order of a cloud bucket listing.
        files.sort();
        dirs.sort();

        Ok(Listing {
            items: files
                .into_iter()
                .map(|name| format!("{key_prefix}{name}"))
                .collect(),
            prefixes: dirs
                .into_iter()
                .map(|name| format!("{key_prefix}{name}/"))
                .collect(),
        })
    }

    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, ObjectStoreError> {
        let path = self.object_path(key)?;
        if !path.is_file() {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let meta = tokio::fs::metadata(&path).await?;

        let content_type = match tokio::fs::read_to_string(self.content_type_path(key)?).await {
            Ok(declared) => Some(declared.trim().to_string()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                mime_guess::from_path(&path).first().map(|m| m.to_string())
            }
            Err(e) => return Err(e.into()),
        };

        Ok(ObjectMetadata {
            size_bytes: meta.len(),
            content_type,
        })
    }

    async fn download_url(&self, key: &str) -> Result<String, ObjectStoreError> {
        if !self.exists(key).await? {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }
        let mut url = self.public_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ObjectStoreError::Backend(format!("Invalid public URL: {}", self.public_base_url))
            })?
            .pop_if_empty()
            .push("static")
            .extend(key.trim_start_matches('/').split('/'));
        Ok(url.to_string())
    }
}
