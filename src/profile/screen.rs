use serde::Serialize;

use super::{ProfileError, ProfileFields, ProfileSync, UserProfile};
use crate::session::Session;

const LOAD_FAILED: &str = "There was an error while getting your data. Please, try again later.";
const SAVE_FAILED: &str = "There was an error while saving your data. Please, try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileState {
    Unauthenticated,
    Loading,
    /// Signed in with a verified email.
    Editable,
    /// Signed in, email not verified yet.
    Unverifiable,
    Saving,
}

impl ProfileState {
    fn interactive(email_verified: bool) -> Self {
        if email_verified {
            ProfileState::Editable
        } else {
            ProfileState::Unverifiable
        }
    }
}

/// Form state behind the profile screen.
///
/// `Unauthenticated -> Loading -> {Editable | Unverifiable} -> Saving -> Editable`.
/// A failed load or save returns to the previous interactive state and
/// keeps an error until dismissed.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileScreen {
    state: ProfileState,
    fields: ProfileFields,
    error: Option<String>,
}

impl Default for ProfileScreen {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileScreen {
    pub fn new() -> Self {
        Self {
            state: ProfileState::Unauthenticated,
            fields: ProfileFields::default(),
            error: None,
        }
    }

    pub fn state(&self) -> ProfileState {
        self.state
    }

    pub fn fields(&self) -> &ProfileFields {
        &self.fields
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn load(
        &mut self,
        sync: &ProfileSync,
        session: &Session,
    ) -> Result<UserProfile, ProfileError> {
        let prior = self.state;
        self.state = ProfileState::Loading;

        match sync.load(session.uid()).await {
            Ok(profile) => {
                self.fields = profile.fields();
                session.set_liked_movies(profile.liked_movies);
                self.state = ProfileState::interactive(session.email_verified());
                self.error = None;
                Ok(profile)
            }
            Err(e) => {
                self.state = prior;
                self.error = Some(LOAD_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Validate, then write the edited fields together with the session's
    /// current liked-movies count. The loading flag is cleared on every path.
    pub async fn save(
        &mut self,
        sync: &ProfileSync,
        session: &Session,
        edited: ProfileFields,
    ) -> Result<UserProfile, ProfileError> {
        if self.state != ProfileState::Editable {
            return Err(ProfileError::NotEditable(self.state));
        }

        let normalized = match sync.validate(&edited) {
            Ok(fields) => fields,
            Err(e) => {
                self.error = Some(e.to_string());
                return Err(e);
            }
        };

        self.state = ProfileState::Saving;
        let result = sync
            .save(session.uid(), &normalized, session.liked_movies())
            .await;

        self.fields = normalized;
        self.state = ProfileState::Editable;
        match result {
            Ok(profile) => {
                self.error = None;
                Ok(profile)
            }
            Err(e) => {
                self.error = Some(SAVE_FAILED.to_string());
                Err(e)
            }
        }
    }

    /// Re-check email verification ("check email verified" button).
    pub fn set_email_verified(&mut self, verified: bool) {
        if matches!(
            self.state,
            ProfileState::Editable | ProfileState::Unverifiable
        ) {
            self.state = ProfileState::interactive(verified);
        }
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn sign_out(&mut self) {
        *self = Self::new();
    }
}
