//! Per-user document storage: uploads, folders and the file/folder listing.
//!
//! Documents live under `Files/{uid}{route}`. Object storage has no real
//! directories, so a folder is kept alive by a zero-byte `.hidden` blob
//! beneath it. The sentinel never shows up in a listing.

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;

use crate::object_store::{key_name, Listing, ObjectStore, ObjectStoreError};

/// Placeholder blob that makes an empty folder enumerable.
pub const SENTINEL_NAME: &str = ".hidden";

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("{0}")]
    Validation(String),
    /// A file and a folder would share one path.
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Store(#[from] ObjectStoreError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Download URL.
    pub uri: String,
    /// Object name up to its first `.`.
    pub name: String,
    pub size_bytes: u64,
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderEntry {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StorageEntry {
    File(FileEntry),
    Folder(FolderEntry),
}

/// Make a route absolute and slash-terminated: `Docs` -> `/Docs/`, `` -> `/`.
pub fn normalize_route(route: &str) -> Result<String, DocumentError> {
    let segments: Vec<&str> = route.split('/').filter(|s| !s.is_empty()).collect();
    if segments.iter().any(|s| *s == ".." || *s == ".") {
        return Err(DocumentError::Validation(format!("invalid route: {route}")));
    }
    if segments.is_empty() {
        return Ok("/".to_string());
    }
    Ok(format!("/{}/", segments.join("/")))
}

pub fn documents_prefix(uid: &str, route: &str) -> Result<String, DocumentError> {
    if uid.trim().is_empty() || uid.contains('/') {
        return Err(DocumentError::Validation("invalid user id".to_string()));
    }
    Ok(format!("Files/{uid}{}", normalize_route(route)?))
}

/// Display name of a stored file: everything before the first `.`.
pub fn display_name(object_name: &str) -> &str {
    object_name.split('.').next().unwrap_or(object_name)
}

fn validate_name(name: &str, what: &str) -> Result<(), DocumentError> {
    if name.trim().is_empty() {
        return Err(DocumentError::Validation(format!("{what} must not be empty")));
    }
    if name.contains('/') || name == "." || name == ".." {
        return Err(DocumentError::Validation(format!("invalid {what}: {name}")));
    }
    Ok(())
}

/// Turn a raw listing into UI entries: files (minus the sentinel) in listing
/// order, then folders in listing order.
pub async fn reduce_listing(
    store: &dyn ObjectStore,
    listing: Listing,
) -> Result<Vec<StorageEntry>, ObjectStoreError> {
    let mut entries = Vec::with_capacity(listing.items.len() + listing.prefixes.len());

    for key in &listing.items {
        let name = key_name(key);
        if name == SENTINEL_NAME {
            continue;
        }
        let metadata = store.metadata(key).await?;
        let uri = store.download_url(key).await?;
        entries.push(StorageEntry::File(FileEntry {
            uri,
            name: display_name(name).to_string(),
            size_bytes: metadata.size_bytes,
            content_type: metadata.content_type,
        }));
    }

    for prefix in &listing.prefixes {
        entries.push(StorageEntry::Folder(FolderEntry {
            name: key_name(prefix).to_string(),
        }));
    }

    Ok(entries)
}

pub async fn list_documents(
    store: &dyn ObjectStore,
    uid: &str,
    route: &str,
) -> Result<Vec<StorageEntry>, DocumentError> {
    let prefix = documents_prefix(uid, route)?;
    let listing = store.list(&prefix).await?;
    let entries = reduce_listing(store, listing).await?;
    tracing::debug!(uid, prefix = %prefix, entries = entries.len(), "Listed documents");
    Ok(entries)
}

pub async fn upload_document(
    store: &dyn ObjectStore,
    uid: &str,
    route: &str,
    name: &str,
    data: Bytes,
    content_type: Option<&str>,
) -> Result<String, DocumentError> {
    validate_name(name, "file name")?;
    if name == SENTINEL_NAME {
        return Err(DocumentError::Validation(format!("{SENTINEL_NAME} is reserved")));
    }
    let prefix = documents_prefix(uid, route)?;
    let listing = store.list(&prefix).await?;
    if listing.prefixes.iter().any(|p| key_name(p) == name) {
        return Err(DocumentError::Conflict(format!(
            "A folder named {name} already exists here"
        )));
    }

    let key = format!("{prefix}{name}");
    store.put(&key, data, content_type).await?;
    tracing::debug!(uid, key = %key, "Uploaded document");
    Ok(key)
}

pub async fn create_folder(
    store: &dyn ObjectStore,
    uid: &str,
    route: &str,
    folder: &str,
) -> Result<String, DocumentError> {
    validate_name(folder, "folder name")?;
    let prefix = documents_prefix(uid, route)?;
    if store.exists(&format!("{prefix}{folder}")).await? {
        return Err(DocumentError::Conflict(format!(
            "A file named {folder} already exists here"
        )));
    }

    let key = format!("{prefix}{folder}/{SENTINEL_NAME}");
    store.put(&key, Bytes::new(), None).await?;
    tracing::debug!(uid, key = %key, "Created folder");
    Ok(key)
}

pub async fn delete_document(
    store: &dyn ObjectStore,
    uid: &str,
    route: &str,
    name: &str,
) -> Result<(), DocumentError> {
    validate_name(name, "file name")?;
    let key = format!("{}{name}", documents_prefix(uid, route)?);
    if !store.exists(&key).await? {
        return Err(ObjectStoreError::NotFound(key).into());
    }
    store.delete(&key).await?;
    tracing::debug!(uid, key = %key, "Deleted document");
    Ok(())
}
