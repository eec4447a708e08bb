use axum::extract::{Multipart, Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{
    active_session, profile_error, read_upload_form, store_error, verified_session,
};
use crate::api::response::{ApiError, AppJson, JSend};
use crate::profile::{self, ProfileFields, ProfileScreen, ProfileState};
use crate::session::Session;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// What the profile screen renders.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub state: ProfileState,
    pub fields: ProfileFields,
    pub liked_movies: u64,
    pub error: Option<String>,
}

impl ProfileView {
    pub fn new(screen: &ProfileScreen, session: &Session) -> Self {
        Self {
            state: screen.state(),
            fields: screen.fields().clone(),
            liked_movies: session.liked_movies(),
            error: screen.error().map(|s| s.to_string()),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LikedMoviesRequest {
    pub count: u64,
}

#[derive(Debug, Serialize)]
pub struct PictureResponse {
    pub url: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<JSend<ProfileView>>, ApiError> {
    let session = active_session(&state, &uid).await?;
    let mut screen = session.screen.lock().await;

    screen
        .load(&state.profiles, &session)
        .await
        .map_err(profile_error)?;

    Ok(JSend::success(ProfileView::new(&screen, &session)))
}

pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    AppJson(fields): AppJson<ProfileFields>,
) -> Result<Json<JSend<ProfileView>>, ApiError> {
    let session = verified_session(&state, &uid).await?;
    let mut screen = session.screen.lock().await;

    screen
        .save(&state.profiles, &session, fields)
        .await
        .map_err(profile_error)?;

    Ok(JSend::success(ProfileView::new(&screen, &session)))
}

pub async fn dismiss_profile_error(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<JSend<ProfileView>>, ApiError> {
    let session = active_session(&state, &uid).await?;
    let mut screen = session.screen.lock().await;
    screen.dismiss_error();
    Ok(JSend::success(ProfileView::new(&screen, &session)))
}

pub async fn set_liked_movies(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    AppJson(req): AppJson<LikedMoviesRequest>,
) -> Result<Json<JSend<LikedMoviesRequest>>, ApiError> {
    let session = active_session(&state, &uid).await?;

    state
        .profiles
        .set_liked(&uid, req.count)
        .await
        .map_err(profile_error)?;
    session.set_liked_movies(req.count);

    Ok(JSend::success(req))
}

pub async fn update_picture(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    multipart: Multipart,
) -> Result<Json<JSend<PictureResponse>>, ApiError> {
    verified_session(&state, &uid).await?;

    let form = read_upload_form(multipart, state.config.max_upload_size).await?;
    let upload = form
        .file
        .ok_or_else(|| ApiError::bad_request("file field is required"))?;

    profile::set_profile_picture(state.object_store.as_ref(), &uid, upload.data)
        .await
        .map_err(store_error)?;
    let url = profile::profile_picture_url(state.object_store.as_ref(), &uid)
        .await
        .map_err(store_error)?;

    Ok(JSend::success(PictureResponse { url }))
}

pub async fn get_picture(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<JSend<PictureResponse>>, ApiError> {
    active_session(&state, &uid).await?;

    let url = profile::profile_picture_url(state.object_store.as_ref(), &uid)
        .await
        .map_err(store_error)?;

    Ok(JSend::success(PictureResponse { url }))
}
