//! Trust-tier middleware. Each route group is wrapped in exactly one of these.
//!
//! On success the verified credential is inserted into request extensions
//! for handlers to pick up with `Extension<...>`.

use std::sync::Arc;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;
use chrono::Utc;

use super::error::AppError;
use super::ApiState;
use crate::error::AuthRejection;
use crate::trust::TrustTier;

pub async fn strict_federation_auth(
    Extension(state): Extension<Arc<ApiState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match state
        .verifier
        .verify_strict(request.headers(), Utc::now().timestamp())
    {
        Ok(claims) => {
            tracing::debug!(
                company_id = %claims.company_id,
                sub = %claims.sub,
                "Federated query accepted"
            );
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(rejection) => reject(TrustTier::Strict, &request, rejection),
    }
}

pub async fn relaxed_federation_auth(
    Extension(state): Extension<Arc<ApiState>>,
    mut request: Request,
    next: Next,
) -> Response {
    match state.verifier.verify_relaxed(request.headers()) {
        Ok(credential) => {
            request.extensions_mut().insert(credential);
            next.run(request).await
        }
        Err(rejection) => reject(TrustTier::Relaxed, &request, rejection),
    }
}

fn reject(tier: TrustTier, request: &Request, rejection: AuthRejection) -> Response {
    tracing::warn!(
        ?tier,
        path = %request.uri().path(),
        reason = rejection.reason(),
        "Rejected federated request: {rejection}"
    );
    AppError::from(rejection).into_response()
}
