mod local;
mod rtdb;

pub use local::LocalRecordStore;
pub use rtdb::RtdbStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RecordStoreError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// JSON-shaped key-value records addressed by `/`-separated paths
/// (`users/{uid}`).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Read a record. An absent record is `Ok(None)`.
    async fn read(&self, path: &str) -> Result<Option<Value>, RecordStoreError>;
    /// Replace the whole record.
    async fn write(&self, path: &str, record: Value) -> Result<(), RecordStoreError>;
    /// Shallow-merge `partial` into the record, creating it when absent.
    async fn update(&self, path: &str, partial: Map<String, Value>)
        -> Result<(), RecordStoreError>;
}

/// Normalize a record path so `/users/u1/` and `users/u1` address the same record.
pub fn normalize_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// Apply a shallow merge the way the realtime database does: top-level keys
/// of `partial` replace those of `existing`; a non-object record is replaced.
pub fn merge_shallow(existing: Option<Value>, partial: Map<String, Value>) -> Value {
    let mut base = match existing {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    for (key, value) in partial {
        if value.is_null() {
            base.remove(&key);
        } else {
            base.insert(key, value);
        }
    }
    Value::Object(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/users/u1/"), "users/u1");
        assert_eq!(normalize_path("users//u1"), "users/u1");
    }

    #[test]
    fn test_merge_shallow_keeps_untouched_fields() {
        let existing = json!({"displayName": "Ana", "likedMovies": 1});
        let mut partial = Map::new();
        partial.insert("likedMovies".to_string(), json!(4));

        let merged = merge_shallow(Some(existing), partial);
        assert_eq!(merged, json!({"displayName": "Ana", "likedMovies": 4}));
    }

    #[test]
    fn test_merge_shallow_null_removes_key() {
        let existing = json!({"gender": "f", "surname": "Ruiz"});
        let mut partial = Map::new();
        partial.insert("gender".to_string(), Value::Null);

        let merged = merge_shallow(Some(existing), partial);
        assert_eq!(merged, json!({"surname": "Ruiz"}));
    }

    #[test]
    fn test_merge_shallow_creates_missing_record() {
        let mut partial = Map::new();
        partial.insert("likedMovies".to_string(), json!(2));
        assert_eq!(merge_shallow(None, partial), json!({"likedMovies": 2}));
    }
}
