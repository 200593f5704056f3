//! Process-lifetime dependencies, built once at startup and passed by
//! reference into every adapter. There are no module-level singletons.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;

use crate::config::FederationConfig;
use crate::store::{BlobStore, DocumentStore};

#[derive(Clone)]
pub struct FederationContext {
    pub config: Arc<FederationConfig>,
    pub http: Client,
    pub store: Arc<dyn DocumentStore>,
    pub blobs: Arc<dyn BlobStore>,
}

impl FederationContext {
    /// Build the shared HTTP client with the configured Platform timeout.
    pub fn new(
        config: FederationConfig,
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.platform_timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config: Arc::new(config),
            http,
            store,
            blobs,
        })
    }
}
