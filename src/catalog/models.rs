use serde::{Deserialize, Serialize};

/// A movie as served by the movie API. `ratings`, `likes` and `user_liked`
/// are the only parts this service ever changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub rating: String,
    #[serde(default)]
    pub picture_url: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub actors: Vec<String>,
    #[serde(default)]
    pub ratings: Vec<Rating>,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub user_liked: Vec<String>,
}

/// A user's comment and score for a movie. At most one per user and movie.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub user_id: String,
    pub comment: String,
    pub rating: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeRequest {
    pub user_id: String,
    pub liked: bool,
}

/// The movie's like state after a like/unlike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub user_liked: Vec<String>,
}
