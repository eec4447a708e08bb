use thiserror::Error;

use crate::profile::parse_region;

pub const DEFAULT_MOVIE_API_URL: &str = "https://api-w6avz2it7a-uc.a.run.app";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub node: NodeConfig,
    pub storage: StorageConfig,
    /// Base URL of the movie REST API
    pub movie_api_url: String,
    /// Region used to read phone numbers written without a country code
    pub default_phone_region: String,
    /// Maximum upload size in bytes
    pub max_upload_size: u64,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    pub data_dir: String,
    /// Externally reachable URL of this service, used for local download links
    pub public_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// Cloud Storage bucket + Realtime Database
    Firebase,
    /// Local filesystem blobs + redb records
    Local,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Directory for local storage backend
    pub local_storage_path: String,
    /// Storage bucket name (required when backend is firebase)
    pub firebase_bucket: Option<String>,
    /// Realtime Database URL (required when backend is firebase)
    pub firebase_database_url: Option<String>,
    /// Path to a service account JSON (optional, defaults to the metadata server)
    pub google_credentials_file: Option<String>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./data".to_string(),
            public_base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Local,
            local_storage_path: "./files".to_string(),
            firebase_bucket: None,
            firebase_database_url: None,
            google_credentials_file: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            storage: StorageConfig::default(),
            movie_api_url: DEFAULT_MOVIE_API_URL.to_string(),
            default_phone_region: "ES".to_string(),
            max_upload_size: 50 * 1024 * 1024, // 50MB
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or(defaults.node.bind_address);

        let data_dir = std::env::var("DATA_DIR").unwrap_or(defaults.node.data_dir);

        let public_base_url =
            std::env::var("PUBLIC_BASE_URL").unwrap_or(defaults.node.public_base_url);

        let max_upload_size = std::env::var("MAX_UPLOAD_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_upload_size);

        let backend = match std::env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "local".to_string())
            .to_lowercase()
            .as_str()
        {
            "firebase" | "gcs" => StorageBackend::Firebase,
            _ => StorageBackend::Local,
        };

        let local_storage_path =
            std::env::var("LOCAL_STORAGE_PATH").unwrap_or(defaults.storage.local_storage_path);

        let movie_api_url = std::env::var("MOVIE_API_URL").unwrap_or(defaults.movie_api_url);

        let default_phone_region =
            std::env::var("DEFAULT_PHONE_REGION").unwrap_or(defaults.default_phone_region);

        let config = Config {
            node: NodeConfig {
                bind_address,
                data_dir,
                public_base_url,
            },
            storage: StorageConfig {
                backend,
                local_storage_path,
                firebase_bucket: std::env::var("FIREBASE_BUCKET").ok(),
                firebase_database_url: std::env::var("FIREBASE_DATABASE_URL").ok(),
                google_credentials_file: std::env::var("GOOGLE_CREDENTIALS_FILE").ok(),
            },
            movie_api_url,
            default_phone_region,
            max_upload_size,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage.backend == StorageBackend::Firebase {
            if self.storage.firebase_bucket.is_none() {
                return Err(ConfigError::ValidationError(
                    "FIREBASE_BUCKET is required when STORAGE_BACKEND=firebase".to_string(),
                ));
            }
            if self.storage.firebase_database_url.is_none() {
                return Err(ConfigError::ValidationError(
                    "FIREBASE_DATABASE_URL is required when STORAGE_BACKEND=firebase".to_string(),
                ));
            }
        }

        if !self.movie_api_url.starts_with("http://") && !self.movie_api_url.starts_with("https://")
        {
            return Err(ConfigError::ValidationError(format!(
                "MOVIE_API_URL must be an http(s) URL, got '{}'",
                self.movie_api_url
            )));
        }

        parse_region(&self.default_phone_region)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.max_upload_size == 0 {
            tracing::warn!("MAX_UPLOAD_SIZE is 0; every upload will be rejected");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_firebase_requires_bucket_and_database() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Firebase;
        assert!(config.validate().is_err());

        config.storage.firebase_bucket = Some("demo.appspot.com".to_string());
        assert!(config.validate().is_err());

        config.storage.firebase_database_url =
            Some("https://demo-default-rtdb.firebaseio.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_phone_region_rejected() {
        let config = Config {
            default_phone_region: "NOPE".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
