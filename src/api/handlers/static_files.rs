use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

use super::store_error;
use crate::api::response::ApiError;
use crate::AppState;

/// Serve blob content by key. This is where the local backend's download
/// URLs point.
/// Route: GET /static/*key
pub async fn serve_static(
    State(state): State<Arc<AppState>>,
    axum::extract::Path(key): axum::extract::Path<String>,
) -> Result<Response, ApiError> {
    let metadata = state.object_store.metadata(&key).await.map_err(store_error)?;
    let data = state.object_store.get(&key).await.map_err(store_error)?;

    let mut response = (StatusCode::OK, data).into_response();
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_TYPE,
        metadata
            .content_type
            .as_deref()
            .and_then(|ct| ct.parse().ok())
            .unwrap_or(header::HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        header::HeaderValue::from(metadata.size_bytes),
    );

    let filename = key.rsplit('/').next().unwrap_or(&key);
    if let Ok(value) = format!("inline; filename=\"{filename}\"").parse() {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }

    // Documents and pictures can be replaced in place.
    headers.insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("private, no-cache"),
    );

    Ok(response)
}
