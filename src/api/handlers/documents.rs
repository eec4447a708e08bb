use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{document_error, read_upload_form, verified_session};
use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::documents::{self, StorageEntry};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct RouteParams {
    #[serde(default = "default_route")]
    pub route: String,
}

#[derive(Debug, Deserialize)]
pub struct DeleteDocumentParams {
    #[serde(default = "default_route")]
    pub route: String,
    pub name: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateFolderRequest {
    #[serde(default = "default_route")]
    pub route: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct ListingResponse {
    pub route: String,
    pub entries: Vec<StorageEntry>,
}

fn default_route() -> String {
    "/".to_string()
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    AppQuery(params): AppQuery<RouteParams>,
) -> Result<Json<JSend<ListingResponse>>, ApiError> {
    verified_session(&state, &uid).await?;
    listing(&state, &uid, &params.route).await.map(JSend::success)
}

/// Upload a file into `route`, then return the refreshed listing of `route`.
pub async fn upload_document(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    multipart: Multipart,
) -> Result<Json<JSend<ListingResponse>>, ApiError> {
    verified_session(&state, &uid).await?;

    let form = read_upload_form(multipart, state.config.max_upload_size).await?;
    let upload = form
        .file
        .ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let name = upload
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("file name is required"))?;
    let route = form.route.unwrap_or_else(default_route);

    // Prefer the declared content type, fall back to a guess from the name.
    let content_type = upload
        .content_type
        .filter(|ct| ct != "application/octet-stream")
        .or_else(|| mime_guess::from_path(&name).first().map(|m| m.to_string()));

    if let Err(e) = documents::upload_document(
        state.object_store.as_ref(),
        &uid,
        &route,
        &name,
        upload.data,
        content_type.as_deref(),
    )
    .await
    {
        tracing::error!(uid = %uid, route = %route, error = %e, "Upload failed");
        return Err(document_error(e));
    }

    listing(&state, &uid, &route).await.map(JSend::success)
}

pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    AppJson(req): AppJson<CreateFolderRequest>,
) -> Result<Json<JSend<ListingResponse>>, ApiError> {
    verified_session(&state, &uid).await?;

    documents::create_folder(state.object_store.as_ref(), &uid, &req.route, &req.name)
        .await
        .map_err(document_error)?;

    listing(&state, &uid, &req.route).await.map(JSend::success)
}

pub async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    AppQuery(params): AppQuery<DeleteDocumentParams>,
) -> Result<Json<JSend<ListingResponse>>, ApiError> {
    verified_session(&state, &uid).await?;

    documents::delete_document(
        state.object_store.as_ref(),
        &uid,
        &params.route,
        &params.name,
    )
    .await
    .map_err(document_error)?;

    listing(&state, &uid, &params.route).await.map(JSend::success)
}

// ============================================================================
// Helpers
// ============================================================================

async fn listing(state: &AppState, uid: &str, route: &str) -> Result<ListingResponse, ApiError> {
    let route = documents::normalize_route(route).map_err(document_error)?;
    let entries = documents::list_documents(state.object_store.as_ref(), uid, &route)
        .await
        .map_err(|e| {
            tracing::error!(uid, route = %route, error = %e, "Failed to list documents");
            document_error(e)
        })?;
    Ok(ListingResponse { route, entries })
}
