use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use movie_hub::catalog::{self, CatalogClient, LikeError};
use movie_hub::profile::{
    parse_region, ProfileError, ProfileFields, ProfileScreen, ProfileState, ProfileSync,
};
use movie_hub::record_store::{merge_shallow, RecordStore, RecordStoreError};
use movie_hub::session::{Session, SessionUser};

/// In-memory record store that counts writes and can be told to fail them.
#[derive(Default)]
struct RecordingStore {
    records: Mutex<HashMap<String, Value>>,
    writes: AtomicUsize,
    updates: AtomicUsize,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    fn record(&self, path: &str) -> Option<Value> {
        self.records.lock().unwrap().get(path).cloned()
    }

    fn fail(&self) -> Result<(), RecordStoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RecordStoreError::Backend("unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, RecordStoreError> {
        Ok(self.record(path))
    }

    async fn write(&self, path: &str, record: Value) -> Result<(), RecordStoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.fail()?;
        self.records
            .lock()
            .unwrap()
            .insert(path.to_string(), record);
        Ok(())
    }

    async fn update(
        &self,
        path: &str,
        partial: Map<String, Value>,
    ) -> Result<(), RecordStoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.fail()?;
        let mut records = self.records.lock().unwrap();
        let merged = merge_shallow(records.get(path).cloned(), partial);
        records.insert(path.to_string(), merged);
        Ok(())
    }
}

fn setup() -> (Arc<RecordingStore>, ProfileSync) {
    let store = Arc::new(RecordingStore::default());
    let sync = ProfileSync::new(store.clone(), parse_region("ES").unwrap());
    (store, sync)
}

fn fields(phone: &str) -> ProfileFields {
    ProfileFields {
        display_name: "Ana".to_string(),
        surname: "García".to_string(),
        phone_number: phone.to_string(),
        gender: "female".to_string(),
        date_of_birth: "1990-04-01".to_string(),
    }
}

fn session(uid: &str, verified: bool) -> Session {
    Session::new(SessionUser {
        uid: uid.to_string(),
        email_verified: verified,
    })
}

// ============================================================================
// ProfileSync
// ============================================================================

#[tokio::test]
async fn test_load_missing_record_is_empty_profile() {
    let (_, sync) = setup();
    let profile = sync.load("u1").await.unwrap();
    assert_eq!(profile.liked_movies, 0);
    assert_eq!(profile.display_name, "");
    assert_eq!(profile.phone_number, "");
}

#[tokio::test]
async fn test_save_normalizes_phone_and_embeds_count() {
    let (store, sync) = setup();

    let saved = sync.save("u1", &fields("612 345 678"), 4).await.unwrap();
    assert_eq!(saved.phone_number, "+34612345678");

    assert_eq!(
        store.record("users/u1").unwrap(),
        json!({
            "displayName": "Ana",
            "surname": "García",
            "phoneNumber": "+34612345678",
            "gender": "female",
            "dateOfBirth": "1990-04-01",
            "likedMovies": 4
        })
    );

    let loaded = sync.load("u1").await.unwrap();
    assert_eq!(loaded, saved);
}

#[tokio::test]
async fn test_invalid_phone_writes_nothing() {
    let (store, sync) = setup();

    let result = sync.save("u1", &fields("not-a-number"), 0).await;

    assert!(matches!(result, Err(ProfileError::Validation(_))));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    assert!(store.record("users/u1").is_none());
}

#[tokio::test]
async fn test_empty_phone_is_saved_empty() {
    let (store, sync) = setup();

    sync.save("u1", &fields("   "), 0).await.unwrap();

    let record = store.record("users/u1").unwrap();
    assert_eq!(record["phoneNumber"], json!(""));
}

#[tokio::test]
async fn test_set_liked_touches_only_the_counter() {
    let (store, sync) = setup();
    sync.save("u1", &fields(""), 1).await.unwrap();

    sync.set_liked("u1", 7).await.unwrap();

    let record = store.record("users/u1").unwrap();
    assert_eq!(record["likedMovies"], json!(7));
    assert_eq!(record["displayName"], json!("Ana"));
    assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    assert_eq!(store.updates.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_save_overwrites_concurrent_counter_update() {
    let (store, sync) = setup();
    sync.save("u1", &fields(""), 2).await.unwrap();

    // Another device bumps the counter; a save with a stale count wins.
    sync.set_liked("u1", 5).await.unwrap();
    sync.save("u1", &fields(""), 2).await.unwrap();

    assert_eq!(store.record("users/u1").unwrap()["likedMovies"], json!(2));
}

#[tokio::test]
async fn test_empty_uid_is_rejected() {
    let (_, sync) = setup();
    assert!(matches!(
        sync.load("").await,
        Err(ProfileError::Validation(_))
    ));
    assert!(matches!(
        sync.set_liked(" ", 1).await,
        Err(ProfileError::Validation(_))
    ));
}

// ============================================================================
// ProfileScreen
// ============================================================================

#[tokio::test]
async fn test_screen_load_picks_interactive_state() {
    let (_, sync) = setup();
    sync.save("u1", &fields(""), 3).await.unwrap();

    let verified = session("u1", true);
    let mut screen = ProfileScreen::new();
    assert_eq!(screen.state(), ProfileState::Unauthenticated);
    screen.load(&sync, &verified).await.unwrap();
    assert_eq!(screen.state(), ProfileState::Editable);
    assert_eq!(screen.fields().display_name, "Ana");
    assert_eq!(verified.liked_movies(), 3);

    let unverified = session("u1", false);
    let mut screen = ProfileScreen::new();
    screen.load(&sync, &unverified).await.unwrap();
    assert_eq!(screen.state(), ProfileState::Unverifiable);

    // Verifying the email later unlocks editing.
    screen.set_email_verified(true);
    assert_eq!(screen.state(), ProfileState::Editable);
}

#[tokio::test]
async fn test_screen_save_requires_editable() {
    let (store, sync) = setup();
    let unverified = session("u1", false);
    let mut screen = ProfileScreen::new();
    screen.load(&sync, &unverified).await.unwrap();

    let result = screen.save(&sync, &unverified, fields("")).await;

    assert!(matches!(
        result,
        Err(ProfileError::NotEditable(ProfileState::Unverifiable))
    ));
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_screen_save_uses_session_count() {
    let (store, sync) = setup();
    let user = session("u1", true);
    let mut screen = ProfileScreen::new();
    screen.load(&sync, &user).await.unwrap();
    user.set_liked_movies(9);

    let saved = screen.save(&sync, &user, fields("612345678")).await.unwrap();

    assert_eq!(saved.liked_movies, 9);
    assert_eq!(screen.state(), ProfileState::Editable);
    assert_eq!(screen.fields().phone_number, "+34612345678");
    assert!(screen.error().is_none());
    assert_eq!(store.record("users/u1").unwrap()["likedMovies"], json!(9));
}

#[tokio::test]
async fn test_screen_save_failure_returns_to_editable() {
    let (store, sync) = setup();
    let user = session("u1", true);
    let mut screen = ProfileScreen::new();
    screen.load(&sync, &user).await.unwrap();
    store.fail_writes.store(true, Ordering::SeqCst);

    let result = screen.save(&sync, &user, fields("612 345 678")).await;

    assert!(matches!(result, Err(ProfileError::Store(_))));
    assert_eq!(screen.state(), ProfileState::Editable);
    assert_eq!(screen.fields().phone_number, "+34612345678");
    assert!(screen.error().is_some());

    screen.dismiss_error();
    assert!(screen.error().is_none());
}

#[tokio::test]
async fn test_screen_validation_failure_keeps_state() {
    let (store, sync) = setup();
    let user = session("u1", true);
    let mut screen = ProfileScreen::new();
    screen.load(&sync, &user).await.unwrap();

    let result = screen.save(&sync, &user, fields("not-a-number")).await;

    assert!(matches!(result, Err(ProfileError::Validation(_))));
    assert_eq!(screen.state(), ProfileState::Editable);
    assert!(screen.error().is_some());
    assert_eq!(store.writes.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_screen_sign_out_resets() {
    let (_, sync) = setup();
    let user = session("u1", true);
    let mut screen = ProfileScreen::new();
    screen.load(&sync, &user).await.unwrap();

    screen.sign_out();

    assert_eq!(screen.state(), ProfileState::Unauthenticated);
    assert_eq!(screen.fields(), &ProfileFields::default());
}

// ============================================================================
// Like toggle
// ============================================================================

#[tokio::test]
async fn test_toggle_like_rolls_back_when_movie_api_fails() {
    let (store, sync) = setup();
    // Nothing listens on the discard port.
    let catalog = CatalogClient::new("http://127.0.0.1:9").unwrap();
    let user = session("u1", true);
    user.set_liked_movies(2);

    let result = catalog::toggle_like(&catalog, &sync, &user, "m1", true).await;

    assert!(matches!(result, Err(LikeError::Catalog(_))));
    assert_eq!(user.liked_movies(), 2);
    assert_eq!(store.updates.load(Ordering::SeqCst), 0);
}

/// Record store whose first `update` parks until released and then fails.
#[derive(Default)]
struct GatedStore {
    updates: AtomicUsize,
    entered: tokio::sync::Notify,
    release: tokio::sync::Notify,
}

#[async_trait]
impl RecordStore for GatedStore {
    async fn read(&self, _path: &str) -> Result<Option<Value>, RecordStoreError> {
        Ok(None)
    }

    async fn write(&self, _path: &str, _record: Value) -> Result<(), RecordStoreError> {
        Ok(())
    }

    async fn update(
        &self,
        _path: &str,
        _partial: Map<String, Value>,
    ) -> Result<(), RecordStoreError> {
        if self.updates.fetch_add(1, Ordering::SeqCst) == 0 {
            self.entered.notify_one();
            self.release.notified().await;
            return Err(RecordStoreError::Backend("unavailable".to_string()));
        }
        Ok(())
    }
}

async fn spawn_likes_api() -> String {
    use axum::routing::put;

    let router = axum::Router::new().route(
        "/movies/:id/likes",
        put(|| async { axum::Json(json!({"likes": 1, "userLiked": ["u1"]})) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    base
}

#[tokio::test]
async fn test_failed_like_keeps_overlapping_like() {
    let store = Arc::new(GatedStore::default());
    let sync = Arc::new(ProfileSync::new(store.clone(), parse_region("ES").unwrap()));
    let catalog = CatalogClient::new(&spawn_likes_api().await).unwrap();
    let user = Arc::new(session("u1", true));
    user.set_liked_movies(2);

    // First like: 2 -> 3, then stalls on the profile update.
    let first = {
        let (catalog, sync, user) = (catalog.clone(), Arc::clone(&sync), Arc::clone(&user));
        tokio::spawn(async move { catalog::toggle_like(&catalog, &sync, &user, "m1", true).await })
    };
    store.entered.notified().await;

    // Second like goes through: 3 -> 4.
    let second = catalog::toggle_like(&catalog, &sync, &user, "m2", true)
        .await
        .unwrap();
    assert_eq!(second.liked_movies, 4);

    store.release.notify_one();
    let result = first.await.unwrap();

    assert!(matches!(result, Err(LikeError::Profile(_))));
    assert_eq!(user.liked_movies(), 3);
}
