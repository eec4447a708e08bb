use movie_hub::record_store::{LocalRecordStore, RecordStore};
use serde_json::{json, Map, Value};

fn test_store() -> (tempfile::TempDir, LocalRecordStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalRecordStore::open(dir.path().join("data")).unwrap();
    (dir, store)
}

fn partial(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

#[tokio::test]
async fn test_read_missing_record() {
    let (_dir, store) = test_store();
    assert!(store.read("users/nobody").await.unwrap().is_none());
}

#[tokio::test]
async fn test_write_replaces_whole_record() {
    let (_dir, store) = test_store();

    store
        .write("users/u1", json!({"displayName": "Ana", "gender": "f"}))
        .await
        .unwrap();
    store
        .write("users/u1", json!({"displayName": "Eva"}))
        .await
        .unwrap();

    let record = store.read("users/u1").await.unwrap().unwrap();
    assert_eq!(record, json!({"displayName": "Eva"}));
}

#[tokio::test]
async fn test_update_merges_top_level_fields() {
    let (_dir, store) = test_store();

    store
        .write("users/u1", json!({"displayName": "Ana", "likedMovies": 1}))
        .await
        .unwrap();
    store
        .update("users/u1", partial("likedMovies", json!(7)))
        .await
        .unwrap();

    let record = store.read("users/u1").await.unwrap().unwrap();
    assert_eq!(record, json!({"displayName": "Ana", "likedMovies": 7}));
}

#[tokio::test]
async fn test_update_creates_missing_record() {
    let (_dir, store) = test_store();

    store
        .update("users/u2", partial("likedMovies", json!(2)))
        .await
        .unwrap();

    let record = store.read("/users/u2/").await.unwrap().unwrap();
    assert_eq!(record, json!({"likedMovies": 2}));
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = LocalRecordStore::open(dir.path()).unwrap();
        store
            .write("users/u1", json!({"surname": "Ruiz"}))
            .await
            .unwrap();
    }

    let store = LocalRecordStore::open(dir.path()).unwrap();
    let record = store.read("users/u1").await.unwrap().unwrap();
    assert_eq!(record["surname"], "Ruiz");
}
