use bytes::Bytes;

use crate::object_store::{ObjectStore, ObjectStoreError};

pub fn picture_key(uid: &str) -> String {
    format!("ProfilePictures/{uid}.jpg")
}

/// Upload (or replace) a user's profile picture.
pub async fn set_profile_picture(
    store: &dyn ObjectStore,
    uid: &str,
    data: Bytes,
) -> Result<(), ObjectStoreError> {
    let key = picture_key(uid);
    store.put(&key, data, Some("image/jpeg")).await?;
    tracing::debug!(uid, "Stored profile picture");
    Ok(())
}

pub async fn profile_picture_url(
    store: &dyn ObjectStore,
    uid: &str,
) -> Result<String, ObjectStoreError> {
    store.download_url(&picture_key(uid)).await
}
