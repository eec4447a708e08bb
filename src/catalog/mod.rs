//! Movie catalog: the REST client for the movie API, the rating upsert and
//! the like toggle that keeps the user's liked-movies counter in step.

mod client;
mod models;

pub use client::{CatalogClient, CatalogError};
pub use models::{LikeRequest, LikeState, Movie, Rating};

use thiserror::Error;

use crate::profile::{ProfileError, ProfileSync};
use crate::session::Session;

/// Insert `rating`, replacing any previous rating by the same user in place.
/// Later duplicates for that user are dropped.
pub fn upsert_rating(ratings: &mut Vec<Rating>, rating: Rating) {
    let Some(index) = ratings.iter().position(|r| r.user_id == rating.user_id) else {
        ratings.push(rating);
        return;
    };

    let user_id = rating.user_id.clone();
    ratings[index] = rating;
    let mut kept = false;
    ratings.retain(|r| {
        if r.user_id != user_id {
            return true;
        }
        !std::mem::replace(&mut kept, true)
    });
}

#[derive(Debug, Error)]
pub enum LikeError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub movie: LikeState,
    pub liked_movies: u64,
}

/// Like or unlike a movie.
///
/// The session's counter moves first so the UI reflects the change right
/// away. The movie API and the profile counter are then updated in turn;
/// if either fails, this call's change to the counter is undone.
pub async fn toggle_like(
    catalog: &CatalogClient,
    profiles: &ProfileSync,
    session: &Session,
    movie_id: &str,
    liked: bool,
) -> Result<LikeOutcome, LikeError> {
    let (previous, count) = session.adjust_liked_movies(liked);

    let movie = match catalog.set_like(movie_id, session.uid(), liked).await {
        Ok(state) => state,
        Err(e) => {
            session.undo_liked_adjustment(previous, count);
            tracing::warn!(uid = %session.uid(), movie_id, error = %e, "Like rejected by movie API");
            return Err(e.into());
        }
    };

    if let Err(e) = profiles.set_liked(session.uid(), count).await {
        session.undo_liked_adjustment(previous, count);
        return Err(e.into());
    }

    Ok(LikeOutcome {
        movie,
        liked_movies: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(user: &str, comment: &str, value: f64) -> Rating {
        Rating {
            user_id: user.to_string(),
            comment: comment.to_string(),
            rating: value,
        }
    }

    #[test]
    fn test_upsert_rating_replaces_same_user() {
        let mut ratings = vec![rating("a", "ok", 3.0), rating("u", "meh", 2.0)];

        upsert_rating(&mut ratings, rating("u", "great", 5.0));

        assert_eq!(ratings.len(), 2);
        assert_eq!(ratings[1], rating("u", "great", 5.0));
        assert_eq!(ratings[0], rating("a", "ok", 3.0));
    }

    #[test]
    fn test_upsert_rating_appends_new_user() {
        let mut ratings = vec![rating("a", "ok", 3.0)];
        upsert_rating(&mut ratings, rating("b", "fine", 4.0));
        assert_eq!(ratings.len(), 2);
    }

    #[test]
    fn test_upsert_collapses_duplicates() {
        let mut ratings = vec![
            rating("u", "old", 1.0),
            rating("a", "ok", 3.0),
            rating("u", "older", 2.0),
        ];
        upsert_rating(&mut ratings, rating("u", "new", 4.0));
        assert_eq!(ratings, vec![rating("u", "new", 4.0), rating("a", "ok", 3.0)]);
    }

    #[test]
    fn test_upsert_twice_keeps_one_entry() {
        let mut ratings = Vec::new();
        upsert_rating(&mut ratings, rating("u", "first", 1.0));
        upsert_rating(&mut ratings, rating("u", "second", 4.5));
        assert_eq!(ratings, vec![rating("u", "second", 4.5)]);
    }
}
