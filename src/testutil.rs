//! Shared test helpers for movie-hub unit tests.

use std::sync::Arc;

use crate::config::{Config, NodeConfig, StorageConfig};
use crate::object_store::LocalStore;
use crate::record_store::LocalRecordStore;
use crate::AppState;

/// Create a test AppState with a temporary record database and local object store.
pub fn test_state(temp_dir: &tempfile::TempDir) -> Arc<AppState> {
    let data_dir = temp_dir.path().join("data");
    let files_dir = temp_dir.path().join("files");

    let config = Config {
        node: NodeConfig {
            bind_address: "127.0.0.1:0".to_string(),
            data_dir: data_dir.to_string_lossy().to_string(),
            public_base_url: "http://127.0.0.1:8080".to_string(),
        },
        storage: StorageConfig {
            local_storage_path: files_dir.to_string_lossy().to_string(),
            ..Default::default()
        },
        // Nothing listens here; catalog calls fail fast.
        movie_api_url: "http://127.0.0.1:9".to_string(),
        max_upload_size: 10 * 1024 * 1024, // 10MB for tests
        ..Default::default()
    };

    let records = LocalRecordStore::open(&data_dir).expect("Failed to open test record store");
    let object_store = LocalStore::new(&files_dir, &config.node.public_base_url)
        .expect("Failed to create test object store");

    Arc::new(
        AppState::new(config, Arc::new(object_store), Arc::new(records))
            .expect("Failed to build test state"),
    )
}
