//! federation_server — standalone host for the federation endpoints.
//!
//! Reads config from env vars (a `.env` file is honoured):
//!   FEDERATION_APP_ID, PLATFORM_BASE_URL, PLATFORM_JWT_SECRET,
//!   FEDERATION_JWT_SECRET  — required, see `FederationConfig`
//!   FEDERATION_BIND_ADDR   — listen address (default: 0.0.0.0:4200)
//!   FEDERATION_SEED_FILE   — JSON document seed for the in-memory store
//!   FEDERATION_BLOB_DIR    — artifact directory (default: in-memory blobs)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use visitor_federation::api::build_router;
use visitor_federation::store::{
    BlobStore, DocumentStore, FsBlobStore, MemoryBlobStore, MemoryDocumentStore,
};
use visitor_federation::{FederationConfig, FederationContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,visitor_federation=debug".into()),
        )
        .init();

    let config = FederationConfig::from_env()?;
    let bind_addr =
        std::env::var("FEDERATION_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:4200".into());

    let store: Arc<dyn DocumentStore> = match std::env::var_os("FEDERATION_SEED_FILE") {
        Some(path) => {
            let path = PathBuf::from(path);
            let store = MemoryDocumentStore::from_json_file(&path)
                .await
                .with_context(|| format!("Failed to load seed file {}", path.display()))?;
            tracing::info!("Seeded document store from {}", path.display());
            Arc::new(store)
        }
        None => Arc::new(MemoryDocumentStore::new()),
    };

    let blobs: Arc<dyn BlobStore> = match std::env::var_os("FEDERATION_BLOB_DIR") {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            let blobs = FsBlobStore::open_dir(&dir)
                .await
                .with_context(|| format!("Failed to open blob directory {}", dir.display()))?;
            tracing::info!("Serving artifacts from {}", dir.display());
            Arc::new(blobs)
        }
        None => Arc::new(MemoryBlobStore::new()),
    };

    tracing::info!(
        app_id = %config.app_id,
        platform = %config.platform_base_url,
        artifact_base = config.public_base_url.as_deref().unwrap_or("<none>"),
        "Federation configured"
    );

    let ctx = FederationContext::new(config, store, blobs)?;
    let app = build_router(ctx);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {bind_addr}"))?;
    tracing::info!("federation_server listening on {bind_addr}");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
