use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::models::{LikeRequest, LikeState, Movie, Rating};

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Movie API request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Movie not found: {0}")]
    NotFound(String),
    #[error("Movie API returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("Unexpected movie API response: {0}")]
    Decode(String),
}

/// Client for the movie REST API. Every request carries
/// `Accept: application/json` and is resolved against a fixed base URL.
#[derive(Clone)]
pub struct CatalogClient {
    base_url: String,
    client: Client,
}

impl CatalogClient {
    pub fn new(base_url: &str) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn decode<T: DeserializeOwned>(
        resp: reqwest::Response,
        what: &str,
    ) -> Result<T, CatalogError> {
        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(CatalogError::NotFound(what.to_string()));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(%status, what, "Movie API request failed");
            return Err(CatalogError::Status { status, body });
        }
        resp.json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, CatalogError> {
        let resp = self.client.get(self.url(path)).send().await?;
        Self::decode(resp, path).await
    }

    async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> Result<T, CatalogError> {
        let resp = self
            .client
            .request(method, self.url(path))
            .json(body)
            .send()
            .await?;
        Self::decode(resp, path).await
    }

    /// All movies. The API may answer with an array or with an object keyed
    /// by movie id; both are accepted, in the order the body lists them.
    pub async fn get_all_movies(&self) -> Result<Vec<Movie>, CatalogError> {
        let body: Value = self.get("/movies").await?;
        movies_from_value(body)
    }

    pub async fn get_movie(&self, id: &str) -> Result<Movie, CatalogError> {
        self.get(&format!("/movies/{id}")).await
    }

    /// Submit a rating and return the movie's ratings as the API now has them.
    pub async fn rate_movie(&self, id: &str, rating: &Rating) -> Result<Vec<Rating>, CatalogError> {
        self.send_json(
            reqwest::Method::POST,
            &format!("/movies/{id}/ratings"),
            rating,
        )
        .await
    }

    pub async fn set_like(
        &self,
        id: &str,
        user_id: &str,
        liked: bool,
    ) -> Result<LikeState, CatalogError> {
        let request = LikeRequest {
            user_id: user_id.to_string(),
            liked,
        };
        self.send_json(reqwest::Method::PUT, &format!("/movies/{id}/likes"), &request)
            .await
    }
}

fn movies_from_value(body: Value) -> Result<Vec<Movie>, CatalogError> {
    let values: Vec<Value> = match body {
        Value::Array(items) => items,
        Value::Object(map) => map.into_iter().map(|(_, v)| v).collect(),
        Value::Null => Vec::new(),
        other => {
            return Err(CatalogError::Decode(format!(
                "expected a list of movies, got {other}"
            )))
        }
    };

    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(|e| CatalogError::Decode(e.to_string())))
        .collect()
}
