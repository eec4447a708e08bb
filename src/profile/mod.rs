//! User profile synchronization.
//!
//! A profile is one JSON record per user at `users/{uid}`. Saves replace the
//! whole record; the liked-movies counter also has its own partial update so
//! the like button does not need to round-trip the full profile.

mod phone;
mod picture;
mod screen;

pub use phone::{normalize_phone, parse_region, PhoneError};
pub use picture::{picture_key, profile_picture_url, set_profile_picture};
pub use screen::{ProfileScreen, ProfileState};

use std::sync::Arc;

use phonenumber::country;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::record_store::{RecordStore, RecordStoreError};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("{0}")]
    Validation(String),
    #[error("Profile cannot be edited while {0:?}")]
    NotEditable(ProfileState),
    #[error(transparent)]
    Store(#[from] RecordStoreError),
}

impl From<PhoneError> for ProfileError {
    fn from(e: PhoneError) -> Self {
        ProfileError::Validation(e.to_string())
    }
}

/// The stored profile record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub display_name: String,
    pub surname: String,
    /// E.164 or empty.
    pub phone_number: String,
    pub gender: String,
    pub date_of_birth: String,
    pub liked_movies: u64,
}

/// The user-editable part of a profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileFields {
    pub display_name: String,
    pub surname: String,
    pub phone_number: String,
    pub gender: String,
    pub date_of_birth: String,
}

impl UserProfile {
    pub fn fields(&self) -> ProfileFields {
        ProfileFields {
            display_name: self.display_name.clone(),
            surname: self.surname.clone(),
            phone_number: self.phone_number.clone(),
            gender: self.gender.clone(),
            date_of_birth: self.date_of_birth.clone(),
        }
    }
}

impl ProfileFields {
    pub fn into_profile(self, liked_movies: u64) -> UserProfile {
        UserProfile {
            display_name: self.display_name,
            surname: self.surname,
            phone_number: self.phone_number,
            gender: self.gender,
            date_of_birth: self.date_of_birth,
            liked_movies,
        }
    }
}

pub fn profile_path(uid: &str) -> String {
    format!("users/{uid}")
}

/// Reads and writes profile records through a [`RecordStore`].
pub struct ProfileSync {
    records: Arc<dyn RecordStore>,
    region: country::Id,
}

impl ProfileSync {
    pub fn new(records: Arc<dyn RecordStore>, region: country::Id) -> Self {
        Self { records, region }
    }

    /// Load a profile. A user without a record gets an empty profile.
    pub async fn load(&self, uid: &str) -> Result<UserProfile, ProfileError> {
        require_uid(uid)?;

        match self.records.read(&profile_path(uid)).await? {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| ProfileError::Store(RecordStoreError::Serialization(e.to_string()))),
            None => {
                tracing::debug!(uid, "No profile record, using empty profile");
                Ok(UserProfile::default())
            }
        }
    }

    /// Check edited fields and return them with the phone number in E.164.
    /// An empty phone number skips validation.
    pub fn validate(&self, fields: &ProfileFields) -> Result<ProfileFields, ProfileError> {
        let mut normalized = fields.clone();
        if !fields.phone_number.trim().is_empty() {
            normalized.phone_number = normalize_phone(&fields.phone_number, self.region)?;
        } else {
            normalized.phone_number = String::new();
        }
        Ok(normalized)
    }

    /// Overwrite the whole profile record with `fields` and `liked_movies`.
    ///
    /// Nothing is written when validation fails. `liked_movies` is whatever
    /// the caller holds in memory; a concurrent `set_liked` from elsewhere is
    /// overwritten.
    pub async fn save(
        &self,
        uid: &str,
        fields: &ProfileFields,
        liked_movies: u64,
    ) -> Result<UserProfile, ProfileError> {
        require_uid(uid)?;
        let profile = self.validate(fields)?.into_profile(liked_movies);

        let record = serde_json::to_value(&profile)
            .map_err(|e| RecordStoreError::Serialization(e.to_string()))?;

        if let Err(e) = self.records.write(&profile_path(uid), record).await {
            tracing::error!(uid, error = %e, "Failed to save profile");
            return Err(e.into());
        }

        tracing::debug!(uid, "Saved profile");
        Ok(profile)
    }

    /// Update only the liked-movies counter.
    pub async fn set_liked(&self, uid: &str, count: u64) -> Result<(), ProfileError> {
        require_uid(uid)?;

        let mut partial = Map::new();
        partial.insert("likedMovies".to_string(), Value::from(count));

        if let Err(e) = self.records.update(&profile_path(uid), partial).await {
            tracing::error!(uid, error = %e, "Failed to update liked movies");
            return Err(e.into());
        }
        Ok(())
    }
}

fn require_uid(uid: &str) -> Result<(), ProfileError> {
    if uid.trim().is_empty() {
        return Err(ProfileError::Validation("user id must not be empty".to_string()));
    }
    Ok(())
}
