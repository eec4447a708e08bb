//! Per-user session context: the signed-in identity, the liked-movies count
//! and the profile form state. Created at sign-in, dropped at sign-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::profile::ProfileScreen;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionUser {
    pub uid: String,
    pub email_verified: bool,
}

#[derive(Debug)]
pub struct Session {
    uid: String,
    email_verified: AtomicBool,
    liked_movies: AtomicU64,
    pub screen: Mutex<ProfileScreen>,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user: SessionUser) -> Self {
        Self {
            uid: user.uid,
            email_verified: AtomicBool::new(user.email_verified),
            liked_movies: AtomicU64::new(0),
            screen: Mutex::new(ProfileScreen::new()),
            started_at: Utc::now(),
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn email_verified(&self) -> bool {
        self.email_verified.load(Ordering::SeqCst)
    }

    pub fn set_email_verified(&self, verified: bool) {
        self.email_verified.store(verified, Ordering::SeqCst);
    }

    /// The in-memory liked-movies count. This is what a profile save embeds.
    pub fn liked_movies(&self) -> u64 {
        self.liked_movies.load(Ordering::SeqCst)
    }

    pub fn set_liked_movies(&self, count: u64) {
        self.liked_movies.store(count, Ordering::SeqCst);
    }

    /// Apply a like (+1) or unlike (-1, floored at zero) and return
    /// `(previous, new)`.
    pub fn adjust_liked_movies(&self, liked: bool) -> (u64, u64) {
        let previous = self
            .liked_movies
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                Some(if liked {
                    count.saturating_add(1)
                } else {
                    count.saturating_sub(1)
                })
            })
            .unwrap_or_else(|count| count);
        let new = if liked {
            previous.saturating_add(1)
        } else {
            previous.saturating_sub(1)
        };
        (previous, new)
    }

    /// Reverse one `adjust_liked_movies` step that went from `previous` to
    /// `new`, keeping any changes made by other calls since.
    pub fn undo_liked_adjustment(&self, previous: u64, new: u64) {
        if previous == new {
            return;
        }
        let _ = self
            .liked_movies
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |count| {
                Some(if new > previous {
                    count.saturating_sub(new - previous)
                } else {
                    count.saturating_add(previous - new)
                })
            });
    }
}

/// All active sessions, keyed by user id.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session, replacing any previous one for the same user.
    pub async fn start(&self, user: SessionUser) -> Arc<Session> {
        let session = Arc::new(Session::new(user));
        let mut sessions = self.sessions.write().await;
        if sessions
            .insert(session.uid().to_string(), Arc::clone(&session))
            .is_some()
        {
            tracing::debug!(uid = %session.uid(), "Replaced existing session");
        }
        session
    }

    pub async fn get(&self, uid: &str) -> Option<Arc<Session>> {
        self.sessions.read().await.get(uid).cloned()
    }

    /// Tear down a session. Returns false if none was active.
    pub async fn end(&self, uid: &str) -> bool {
        let removed = self.sessions.write().await.remove(uid);
        if let Some(ref session) = removed {
            session.screen.lock().await.sign_out();
            let seconds = (Utc::now() - session.started_at).num_seconds();
            tracing::debug!(uid, seconds, "Session torn down");
        }
        removed.is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(uid: &str) -> SessionUser {
        SessionUser {
            uid: uid.to_string(),
            email_verified: true,
        }
    }

    #[test]
    fn test_adjust_liked_movies_floors_at_zero() {
        let session = Session::new(user("u1"));
        assert_eq!(session.adjust_liked_movies(false), (0, 0));
        assert_eq!(session.adjust_liked_movies(true), (0, 1));
        assert_eq!(session.adjust_liked_movies(true), (1, 2));
        assert_eq!(session.adjust_liked_movies(false), (2, 1));
        assert_eq!(session.liked_movies(), 1);
    }

    #[test]
    fn test_undo_keeps_other_adjustments() {
        let session = Session::new(user("u1"));
        session.set_liked_movies(2);

        let (a_prev, a_new) = session.adjust_liked_movies(true);
        session.adjust_liked_movies(true);
        session.undo_liked_adjustment(a_prev, a_new);
        assert_eq!(session.liked_movies(), 3);

        // An unlike that hit the floor changed nothing, so nothing is undone.
        let session = Session::new(user("u2"));
        let (prev, new) = session.adjust_liked_movies(false);
        session.undo_liked_adjustment(prev, new);
        assert_eq!(session.liked_movies(), 0);
    }

    #[tokio::test]
    async fn test_registry_lifecycle() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty().await);

        let session = registry.start(user("u1")).await;
        session.set_liked_movies(3);
        assert_eq!(registry.get("u1").await.unwrap().liked_movies(), 3);

        // A fresh sign-in starts from a clean slate.
        registry.start(user("u1")).await;
        assert_eq!(registry.get("u1").await.unwrap().liked_movies(), 0);
        assert_eq!(registry.len().await, 1);

        assert!(registry.end("u1").await);
        assert!(!registry.end("u1").await);
        assert!(registry.get("u1").await.is_none());
    }
}
