use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{active_session, catalog_error, like_error};
use crate::api::response::{ApiError, AppJson, JSend};
use crate::catalog::{self, LikeOutcome, Movie, Rating};
use crate::AppState;

// ============================================================================
// Types
// ============================================================================

/// A rating as typed into the comment form; the score arrives as text.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RateMovieRequest {
    pub user_id: String,
    #[serde(default)]
    pub comment: String,
    pub rating: String,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeMovieRequest {
    pub user_id: String,
    pub liked: bool,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn list_movies(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<Movie>>>, ApiError> {
    let movies = state
        .catalog
        .get_all_movies()
        .await
        .map_err(catalog_error)?;
    Ok(JSend::success(movies))
}

pub async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<Movie>>, ApiError> {
    let movie = state.catalog.get_movie(&id).await.map_err(catalog_error)?;
    Ok(JSend::success(movie))
}

/// Submit (or resubmit) the user's rating and return the movie's ratings,
/// holding exactly one entry for this user.
pub async fn rate_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<RateMovieRequest>,
) -> Result<Json<JSend<Vec<Rating>>>, ApiError> {
    active_session(&state, &req.user_id).await?;

    let rating = Rating {
        user_id: req.user_id,
        comment: req.comment,
        rating: parse_score(&req.rating)?,
    };

    let mut ratings = state
        .catalog
        .rate_movie(&id, &rating)
        .await
        .map_err(catalog_error)?;
    catalog::upsert_rating(&mut ratings, rating);

    Ok(JSend::success(ratings))
}

pub async fn toggle_like(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<LikeMovieRequest>,
) -> Result<Json<JSend<LikeOutcome>>, ApiError> {
    let session = active_session(&state, &req.user_id).await?;

    let outcome = catalog::toggle_like(&state.catalog, &state.profiles, &session, &id, req.liked)
        .await
        .map_err(like_error)?;

    Ok(JSend::success(outcome))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_score(text: &str) -> Result<f64, ApiError> {
    let score: f64 = text
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("rating must be a number"))?;
    if !score.is_finite() || !(0.0..=5.0).contains(&score) {
        return Err(ApiError::bad_request("rating must be between 0 and 5"));
    }
    Ok(score)
}
