mod documents;
mod internal;
mod movies;
mod profile;
mod sessions;
mod static_files;

use std::sync::Arc;

use axum::extract::Multipart;
use bytes::Bytes;

use crate::api::response::ApiError;
use crate::catalog::{CatalogError, LikeError};
use crate::documents::DocumentError;
use crate::object_store::ObjectStoreError;
use crate::profile::ProfileError;
use crate::record_store::RecordStoreError;
use crate::session::Session;
use crate::AppState;

pub use documents::{create_folder, delete_document, list_documents, upload_document};
pub use internal::health;
pub use movies::{get_movie, list_movies, rate_movie, toggle_like};
pub use profile::{
    dismiss_profile_error, get_picture, get_profile, set_liked_movies, update_picture,
    update_profile,
};
pub use sessions::{end_session, refresh_session, start_session};
pub use static_files::serve_static;

// ============================================================================
// Session guards
// ============================================================================

async fn active_session(state: &AppState, uid: &str) -> Result<Arc<Session>, ApiError> {
    state
        .sessions
        .get(uid)
        .await
        .ok_or_else(|| ApiError::unauthorized("You must sign-in to access this feature."))
}

async fn verified_session(state: &AppState, uid: &str) -> Result<Arc<Session>, ApiError> {
    let session = active_session(state, uid).await?;
    if !session.email_verified() {
        return Err(ApiError::forbidden(
            "You must verify your email to access this feature.",
        ));
    }
    Ok(session)
}

// ============================================================================
// Error mapping
// ============================================================================

fn store_error(e: ObjectStoreError) -> ApiError {
    match e {
        ObjectStoreError::NotFound(_) => ApiError::not_found(e.to_string()),
        ObjectStoreError::InvalidKey(_) => ApiError::bad_request(e.to_string()),
        ObjectStoreError::Io(_) => ApiError::internal(e.to_string()),
        ObjectStoreError::Backend(_) => ApiError::bad_gateway(e.to_string()),
    }
}

fn record_error(e: RecordStoreError) -> ApiError {
    match e {
        RecordStoreError::Backend(_) => ApiError::bad_gateway(e.to_string()),
        _ => ApiError::internal(e.to_string()),
    }
}

fn profile_error(e: ProfileError) -> ApiError {
    match e {
        ProfileError::Validation(msg) => ApiError::bad_request(msg),
        ProfileError::NotEditable(_) => ApiError::conflict(e.to_string()),
        ProfileError::Store(e) => record_error(e),
    }
}

fn document_error(e: DocumentError) -> ApiError {
    match e {
        DocumentError::Validation(msg) => ApiError::bad_request(msg),
        DocumentError::Conflict(msg) => ApiError::conflict(msg),
        DocumentError::Store(e) => store_error(e),
    }
}

fn catalog_error(e: CatalogError) -> ApiError {
    match e {
        CatalogError::NotFound(_) => ApiError::not_found(e.to_string()),
        _ => ApiError::bad_gateway(e.to_string()),
    }
}

fn like_error(e: LikeError) -> ApiError {
    match e {
        LikeError::Catalog(e) => catalog_error(e),
        LikeError::Profile(e) => profile_error(e),
    }
}

// ============================================================================
// Multipart
// ============================================================================

/// An uploaded file plus the plain text fields sent alongside it.
struct UploadForm {
    file: Option<Upload>,
    route: Option<String>,
}

struct Upload {
    name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

async fn read_upload_form(mut multipart: Multipart, max_size: u64) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm {
        file: None,
        route: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                let name = field.file_name().map(|s| s.to_string());
                let content_type = field.content_type().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > max_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {max_size} bytes"
                    )));
                }

                form.file = Some(Upload {
                    name,
                    content_type,
                    data,
                });
            }
            "route" => {
                form.route = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid route: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionUser;
    use crate::testutil::test_state;
    use axum::http::StatusCode;

    fn status_of(err: ApiError) -> StatusCode {
        err.status
    }

    #[tokio::test]
    async fn test_guards_require_session() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);

        let err = active_session(&state, "u1").await.unwrap_err();
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_verified_guard_rejects_unverified_email() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir);
        state
            .sessions
            .start(SessionUser {
                uid: "u1".to_string(),
                email_verified: false,
            })
            .await;

        assert!(active_session(&state, "u1").await.is_ok());
        let err = verified_session(&state, "u1").await.unwrap_err();
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            status_of(profile_error(ProfileError::Validation("bad".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(store_error(ObjectStoreError::NotFound("k".into()))),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(record_error(RecordStoreError::Backend("down".into()))),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(document_error(DocumentError::Conflict("Docs".into()))),
            StatusCode::CONFLICT
        );
    }
}
