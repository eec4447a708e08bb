use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.max_upload_size as usize;

    Router::new()
        // Sessions (sign-in / sign-out)
        .route("/sessions", post(handlers::start_session))
        .route("/sessions/:uid", put(handlers::refresh_session))
        .route("/sessions/:uid", delete(handlers::end_session))
        // Profile
        .route("/users/:uid/profile", get(handlers::get_profile))
        .route("/users/:uid/profile", put(handlers::update_profile))
        .route(
            "/users/:uid/profile/error",
            delete(handlers::dismiss_profile_error),
        )
        .route("/users/:uid/liked-movies", put(handlers::set_liked_movies))
        .route("/users/:uid/picture", get(handlers::get_picture))
        .route(
            "/users/:uid/picture",
            put(handlers::update_picture).layer(DefaultBodyLimit::max(upload_limit)),
        )
        // Documents
        .route("/users/:uid/documents", get(handlers::list_documents))
        .route(
            "/users/:uid/documents",
            post(handlers::upload_document).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/users/:uid/documents", delete(handlers::delete_document))
        .route("/users/:uid/folders", post(handlers::create_folder))
        // Movies
        .route("/movies", get(handlers::list_movies))
        .route("/movies/:id", get(handlers::get_movie))
        .route("/movies/:id/ratings", post(handlers::rate_movie))
        .route("/movies/:id/like", put(handlers::toggle_like))
        // Static content (local backend downloads)
        .route("/static/*key", get(handlers::serve_static))
        // Internal
        .route("/_internal/health", get(handlers::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
