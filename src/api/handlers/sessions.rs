use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{active_session, profile::ProfileView, profile_error};
use crate::api::response::{ApiError, AppJson, JSend};
use crate::session::SessionUser;
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartSessionRequest {
    pub uid: String,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshSessionRequest {
    pub email_verified: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Sign-in: start a session and load the user's profile into it.
pub async fn start_session(
    State(state): State<Arc<AppState>>,
    AppJson(req): AppJson<StartSessionRequest>,
) -> Result<Json<JSend<ProfileView>>, ApiError> {
    if req.uid.trim().is_empty() {
        return Err(ApiError::bad_request("uid must not be empty"));
    }

    let session = state
        .sessions
        .start(SessionUser {
            uid: req.uid.clone(),
            email_verified: req.email_verified,
        })
        .await;

    let mut screen = session.screen.lock().await;
    screen
        .load(&state.profiles, &session)
        .await
        .map_err(profile_error)?;

    tracing::info!(uid = %req.uid, email_verified = req.email_verified, "Session started");
    Ok(JSend::success(ProfileView::new(&screen, &session)))
}

/// Re-check email verification for an active session.
pub async fn refresh_session(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
    AppJson(req): AppJson<RefreshSessionRequest>,
) -> Result<Json<JSend<ProfileView>>, ApiError> {
    let session = active_session(&state, &uid).await?;
    session.set_email_verified(req.email_verified);

    let mut screen = session.screen.lock().await;
    screen.set_email_verified(req.email_verified);

    Ok(JSend::success(ProfileView::new(&screen, &session)))
}

/// Sign-out: drop the session and everything held for it.
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<JSend<()>>, ApiError> {
    if !state.sessions.end(&uid).await {
        return Err(ApiError::not_found("No active session"));
    }
    tracing::info!(uid = %uid, "Session ended");
    Ok(JSend::success(()))
}
