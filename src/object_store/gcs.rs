use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, Url};
use serde::Deserialize;

use super::{Listing, ObjectMetadata, ObjectStore, ObjectStoreError};
use crate::google_auth::TokenSource;

const API_BASE: &str = "https://storage.googleapis.com";
const DOWNLOAD_TOKENS_KEY: &str = "firebaseStorageDownloadTokens";

/// Google Cloud Storage object store backend. Firebase Storage buckets are
/// plain GCS buckets, so this also serves the app's Firebase bucket.
pub struct GcsStore {
    bucket: String,
    client: Client,
    tokens: Arc<TokenSource>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectResource {
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    media_link: Option<String>,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    items: Vec<ListedObject>,
    #[serde(default)]
    prefixes: Vec<String>,
    #[serde(default)]
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct ListedObject {
    name: String,
}

impl GcsStore {
    pub fn new(bucket: &str, client: Client, tokens: Arc<TokenSource>) -> Self {
        Self {
            bucket: bucket.to_string(),
            client,
            tokens,
        }
    }

    async fn token(&self) -> Result<String, ObjectStoreError> {
        self.tokens
            .token()
            .await
            .map_err(|e| ObjectStoreError::Backend(format!("GCS auth failed: {e}")))
    }

    /// Build `{base}/{segments...}/{key}` with the key encoded as a single segment.
    fn url_with_key(&self, base: &str, segments: &[&str], key: &str) -> Result<Url, ObjectStoreError> {
        let mut url = Url::parse(base).map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ObjectStoreError::Backend(format!("Invalid base URL: {base}")))?
            .pop_if_empty()
            .extend(segments)
            .push(key);
        Ok(url)
    }

    fn object_url(&self, key: &str) -> Result<Url, ObjectStoreError> {
        self.url_with_key(API_BASE, &["storage", "v1", "b", &self.bucket, "o"], key)
    }

    fn upload_url(&self) -> String {
        format!("{API_BASE}/upload/storage/v1/b/{}/o", self.bucket)
    }

    fn list_url(&self) -> String {
        format!("{API_BASE}/storage/v1/b/{}/o", self.bucket)
    }

    async fn resource(&self, key: &str) -> Result<ObjectResource, ObjectStoreError> {
        let token = self.token().await?;

        let resp = self
            .client
            .get(self.object_url(key)?)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS metadata failed ({status}): {body}"
            )));
        }

        resp.json()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn put(
        &self,
        key: &str,
        data: Bytes,
        content_type: Option<&str>,
    ) -> Result<(), ObjectStoreError> {
        let token = self.token().await?;
        let content_type = content_type.unwrap_or("application/octet-stream");

        let resp = self
            .client
            .post(self.upload_url())
            .query(&[("uploadType", "media"), ("name", key)])
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS upload failed ({status}): {body}"
            )));
        }

        // Attach a download token so Firebase-style URLs resolve for the object.
        let patch = serde_json::json!({
            "metadata": { DOWNLOAD_TOKENS_KEY: uuid::Uuid::new_v4().to_string() },
        });
        let resp = self
            .client
            .patch(self.object_url(key)?)
            .bearer_auth(&token)
            .json(&patch)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS metadata update failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let token = self.token().await?;
        let mut url = self.object_url(key)?;
        url.query_pairs_mut().append_pair("alt", "media");

        let resp = self
            .client
            .get(url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(key.to_string()));
        }

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS download failed ({status}): {body}"
            )));
        }

        resp.bytes()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), ObjectStoreError> {
        let token = self.token().await?;

        let resp = self
            .client
            .delete(self.object_url(key)?)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

        // 404 is fine -- object already gone
        if !resp.status().is_success() && resp.status() != reqwest::StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "GCS delete failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn exists(&self, key: &str) -> Result<bool, ObjectStoreError> {
        match self.resource(key).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Listing, ObjectStoreError> {
        let token = self.token().await?;
        let mut listing = Listing::default();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.list_url())
                .bearer_auth(&token)
                .query(&[("prefix", prefix), ("delimiter", "/")]);
            if let Some(ref page) = page_token {
                request = request.query(&[("pageToken", page.as_str())]);
            }

            let resp = request
                .send()
                .await
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                return Err(ObjectStoreError::Backend(format!(
                    "GCS list failed ({status}): {body}"
                )));
            }

            let page: ListResponse = resp
                .json()
                .await
                .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;

            listing
                .items
                .extend(page.items.into_iter().map(|item| item.name));
            listing.prefixes.extend(page.prefixes);

            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(listing)
    }

    async fn metadata(&self, key: &str) -> Result<ObjectMetadata, ObjectStoreError> {
        let resource = self.resource(key).await?;
        Ok(ObjectMetadata {
            size_bytes: parse_size(key, resource.size.as_deref())?,
            content_type: resource.content_type,
        })
    }

    async fn download_url(&self, key: &str) -> Result<String, ObjectStoreError> {
        let resource = self.resource(key).await?;

        let firebase_token = resource
            .metadata
            .get(DOWNLOAD_TOKENS_KEY)
            .and_then(|tokens| tokens.split(',').next())
            .map(|t| t.to_string());

        if let Some(token) = firebase_token {
            let mut url = self.url_with_key(
                "https://firebasestorage.googleapis.com",
                &["v0", "b", &self.bucket, "o"],
                key,
            )?;
            url.query_pairs_mut()
                .append_pair("alt", "media")
                .append_pair("token", &token);
            return Ok(url.to_string());
        }

        resource
            .media_link
            .ok_or_else(|| ObjectStoreError::Backend(format!("No download link for {key}")))
    }
}

/// The JSON API reports sizes as decimal strings.
fn parse_size(key: &str, size: Option<&str>) -> Result<u64, ObjectStoreError> {
    let size = size.ok_or_else(|| ObjectStoreError::Backend(format!("No size reported for {key}")))?;
    size.parse().map_err(|_| {
        ObjectStoreError::Backend(format!("Unreadable size {size:?} reported for {key}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("a.pdf", Some("1024")).unwrap(), 1024);
        assert!(matches!(
            parse_size("a.pdf", Some("12kb")),
            Err(ObjectStoreError::Backend(_))
        ));
        assert!(matches!(
            parse_size("a.pdf", None),
            Err(ObjectStoreError::Backend(_))
        ));
    }
}
