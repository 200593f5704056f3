//! Fire-and-forget side work.
//!
//! Tasks spawned here never block or fail the request that started them.
//! Errors are logged and dropped.

use std::future::Future;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;

use crate::store::{DocumentStore, Filter};

pub const CLIENTS_COLLECTION: &str = "federation_clients";

/// Spawn `task` on the runtime, logging (never propagating) its error.
pub fn spawn_detached<F>(name: &'static str, task: F) -> JoinHandle<()>
where
    F: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            tracing::warn!(task = name, "Background task failed: {e:#}");
        }
    })
}

/// Record that a federated caller was seen for a company.
pub fn touch_client_last_seen(
    store: std::sync::Arc<dyn DocumentStore>,
    client_id: String,
    company_id: String,
) -> JoinHandle<()> {
    spawn_detached("client_last_seen", async move {
        let filter = Filter::new()
            .eq("clientId", json!(client_id))
            .eq("companyId", json!(company_id));
        let mut fields = serde_json::Map::new();
        fields.insert("lastSeenAt".into(), json!(Utc::now().to_rfc3339()));
        store
            .upsert_fields(CLIENTS_COLLECTION, &filter, fields)
            .await?;
        Ok(())
    })
}
