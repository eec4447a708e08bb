use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde_json::{Map, Value};

use super::{normalize_path, RecordStore, RecordStoreError};
use crate::google_auth::TokenSource;

/// Firebase Realtime Database over its REST interface.
///
/// `GET`, `PUT` and `PATCH` on `{database_url}/{path}.json` map directly onto
/// read, write and update. A missing node reads back as JSON `null`.
pub struct RtdbStore {
    database_url: String,
    client: Client,
    tokens: Arc<TokenSource>,
}

impl RtdbStore {
    pub fn new(database_url: &str, client: Client, tokens: Arc<TokenSource>) -> Self {
        Self {
            database_url: database_url.trim_end_matches('/').to_string(),
            client,
            tokens,
        }
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, normalize_path(path))
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RecordStoreError> {
        let token = self
            .tokens
            .token()
            .await
            .map_err(|e| RecordStoreError::Backend(format!("Database auth failed: {e}")))?;

        Ok(self
            .client
            .request(method, self.node_url(path))
            .bearer_auth(token))
    }

    async fn send(request: RequestBuilder, action: &str) -> Result<reqwest::Response, RecordStoreError> {
        let resp = request
            .send()
            .await
            .map_err(|e| RecordStoreError::Backend(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(RecordStoreError::Backend(format!(
                "Database {action} failed ({status}): {body}"
            )));
        }

        Ok(resp)
    }
}

#[async_trait]
impl RecordStore for RtdbStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, RecordStoreError> {
        let request = self.request(Method::GET, path).await?;
        let resp = Self::send(request, "read").await?;

        let value: Value = resp
            .json()
            .await
            .map_err(|e| RecordStoreError::Serialization(e.to_string()))?;

        Ok(match value {
            Value::Null => None,
            other => Some(other),
        })
    }

    async fn write(&self, path: &str, record: Value) -> Result<(), RecordStoreError> {
        let request = self.request(Method::PUT, path).await?.json(&record);
        Self::send(request, "write").await?;
        tracing::debug!(path, "Wrote record");
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        partial: Map<String, Value>,
    ) -> Result<(), RecordStoreError> {
        let request = self.request(Method::PATCH, path).await?.json(&partial);
        Self::send(request, "update").await?;
        tracing::debug!(path, "Updated record");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_url() {
        let store = RtdbStore::new(
            "https://demo-default-rtdb.firebaseio.com/",
            Client::new(),
            Arc::new(TokenSource::new(Client::new(), None)),
        );
        assert_eq!(
            store.node_url("/users/u1"),
            "https://demo-default-rtdb.firebaseio.com/users/u1.json"
        );
    }
}
