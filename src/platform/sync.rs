//! Push a locally stored artifact (photo, embedding) onto a Platform actor.
//!
//! Platform only accepts artifacts inline, so the bytes are buffered in full;
//! the upload limit bounds how much that can be.

use crate::context::FederationContext;
use crate::error::FederationError;
use crate::model::ArtifactReference;
use crate::store::read_to_end;

use super::PlatformClient;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

pub async fn sync_actor_artifact(
    ctx: &FederationContext,
    client: &PlatformClient,
    company_id: &str,
    actor_id: &str,
    model: &str,
    handle: &str,
) -> Result<ArtifactReference, FederationError> {
    let limit = ctx.config.upload_limit_bytes;
    let (content_type, bytes) = read_to_end(ctx.blobs.as_ref(), handle, limit)
        .await?
        .ok_or_else(|| FederationError::NotFound(format!("artifact {handle}")))?;

    let content_type = content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE);
    let reference = client
        .upload_actor_artifact(company_id, actor_id, model, content_type, &bytes)
        .await
        .map_err(|e| FederationError::RemoteUnavailable(format!("{e:#}")))?;

    tracing::info!(
        company_id,
        actor_id,
        model,
        bytes = bytes.len(),
        "Synced artifact to Platform"
    );
    Ok(reference)
}
