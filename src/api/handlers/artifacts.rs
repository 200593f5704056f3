//! GET /api/artifacts/:kind/:handle: stream artifact bytes to the caller.
//!
//! This is the canonical path every rewritten `downloadUrl` points at. Local
//! blobs are served first; a handle the blob store does not know is streamed
//! from Platform.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::Path;
use axum::http::header::{CACHE_CONTROL, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::Response;
use axum::Extension;

use crate::api::error::AppError;
use crate::api::ApiState;
use crate::error::FederationError;
use crate::model::ArtifactKind;
use crate::store::{validate_handle, Blob};

pub async fn get_artifact(
    Extension(state): Extension<Arc<ApiState>>,
    Path((kind, handle)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let kind = ArtifactKind::parse(&kind)
        .ok_or_else(|| FederationError::NotFound(format!("artifact kind `{kind}`")))?;
    validate_handle(&handle)
        .map_err(|_| FederationError::InvalidInput(format!("invalid artifact handle `{handle}`")))?;

    let blob = match state.ctx.blobs.open(&handle).await? {
        Some(blob) => Some(blob),
        None => platform_blob(&state, kind, &handle).await,
    }
    .ok_or_else(|| FederationError::NotFound(format!("{} artifact `{handle}`", kind.as_str())))?;

    let mut response = Response::builder()
        .status(StatusCode::OK)
        .header(
            CONTENT_TYPE,
            blob.content_type
                .as_deref()
                .unwrap_or("application/octet-stream"),
        )
        .header(CACHE_CONTROL, "private, max-age=300");
    if let Some(size) = blob.size {
        response = response.header(CONTENT_LENGTH, size);
    }

    response
        .body(Body::from_stream(blob.stream))
        .map_err(|e| AppError::from(anyhow::Error::from(e)))
}

/// Platform failures read as "not found", like every other Platform read.
async fn platform_blob(state: &ApiState, kind: ArtifactKind, handle: &str) -> Option<Blob> {
    match state.platform.fetch_artifact(kind, handle).await {
        Ok(blob) => blob,
        Err(e) => {
            tracing::warn!(handle, kind = kind.as_str(), "Platform artifact fetch failed: {e:#}");
            None
        }
    }
}
