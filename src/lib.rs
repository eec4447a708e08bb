//! movie-hub - backend for the movie catalog app
//!
//! This crate serves the app's mobile shell with:
//! - User profiles kept in a JSON record store (redb locally, Firebase Realtime Database in the cloud)
//! - Per-user documents and folders in object storage (local filesystem or a Firebase/GCS bucket)
//! - Movie listings, ratings and likes proxied from the movie REST API
//! - Per-user sessions holding the liked-movies count and profile form state

pub mod api;
pub mod catalog;
pub mod config;
pub mod documents;
pub mod google_auth;
pub mod object_store;
pub mod profile;
pub mod record_store;
pub mod session;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use catalog::CatalogClient;
use config::Config;
use object_store::ObjectStore;
use profile::ProfileSync;
use record_store::RecordStore;
use session::SessionRegistry;

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub catalog: CatalogClient,
    pub object_store: Arc<dyn ObjectStore>,
    pub profiles: ProfileSync,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(
        config: Config,
        object_store: Arc<dyn ObjectStore>,
        records: Arc<dyn RecordStore>,
    ) -> Result<Self, anyhow::Error> {
        let region = profile::parse_region(&config.default_phone_region)?;
        let catalog = CatalogClient::new(&config.movie_api_url)?;

        Ok(Self {
            catalog,
            object_store,
            profiles: ProfileSync::new(records, region),
            sessions: SessionRegistry::new(),
            config,
        })
    }
}
