use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use movie_hub::{
    api,
    config::{Config, StorageBackend},
    google_auth::TokenSource,
    object_store::{self as obj, ObjectStore},
    record_store::{LocalRecordStore, RecordStore, RtdbStore},
    AppState,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    match log_format.to_lowercase().as_str() {
        "gcp" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_stackdriver::layer())
                .init();
        }
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_list(false),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    info!(version = env!("CARGO_PKG_VERSION"), "movie-hub starting");

    let config = Config::load()?;
    info!(movie_api = %config.movie_api_url, "Loaded configuration");

    let (object_store, records): (Arc<dyn ObjectStore>, Arc<dyn RecordStore>) =
        match config.storage.backend {
            StorageBackend::Local => {
                let store: Arc<dyn ObjectStore> = Arc::new(obj::LocalStore::new(
                    &config.storage.local_storage_path,
                    &config.node.public_base_url,
                )?);
                let records: Arc<dyn RecordStore> =
                    Arc::new(LocalRecordStore::open(&config.node.data_dir)?);
                info!(
                    files = %config.storage.local_storage_path,
                    data = %config.node.data_dir,
                    "Using local storage backend"
                );
                (store, records)
            }
            StorageBackend::Firebase => {
                let (Some(bucket), Some(database_url)) = (
                    config.storage.firebase_bucket.as_deref(),
                    config.storage.firebase_database_url.as_deref(),
                ) else {
                    anyhow::bail!("firebase backend requires FIREBASE_BUCKET and FIREBASE_DATABASE_URL");
                };

                let client = reqwest::Client::builder().build()?;
                let tokens = Arc::new(TokenSource::new(
                    client.clone(),
                    config.storage.google_credentials_file.as_deref(),
                ));
                // Fail at startup rather than on the first request.
                tokens.token().await?;

                info!(bucket, database = database_url, "Using firebase storage backend");
                let store: Arc<dyn ObjectStore> =
                    Arc::new(obj::GcsStore::new(bucket, client.clone(), Arc::clone(&tokens)));
                let records: Arc<dyn RecordStore> =
                    Arc::new(RtdbStore::new(database_url, client, tokens));
                (store, records)
            }
        };

    let state = Arc::new(AppState::new(config.clone(), object_store, records)?);

    let app = api::create_router(Arc::clone(&state));
    let listener = tokio::net::TcpListener::bind(&config.node.bind_address).await?;
    info!("Listening on: {}", config.node.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(
        sessions = state.sessions.len().await,
        "Shutdown complete"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
