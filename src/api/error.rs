//! Maps [`FederationError`] onto HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::error::{FederationError, StoreError};

/// Handler error. Anything convertible into [`FederationError`] converts into this.
#[derive(Debug)]
pub struct AppError(pub FederationError);

impl<E> From<E> for AppError
where
    E: Into<FederationError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl AppError {
    fn code(&self) -> &'static str {
        match &self.0 {
            FederationError::AuthenticationRejected(rejection) => rejection.reason(),
            FederationError::ConfigurationUnavailable(_) => "configuration_unavailable",
            FederationError::RemoteUnavailable(_) => "remote_unavailable",
            FederationError::NotFound(_) => "not_found",
            FederationError::TransformationAnomaly(_) => "transformation_anomaly",
            FederationError::InvalidInput(_) => "invalid_input",
            FederationError::Store(StoreError::TooLarge { .. }) => "payload_too_large",
            FederationError::Store(_) => "store_error",
            FederationError::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self.0 {
            FederationError::Internal(e) => {
                tracing::error!("Internal error: {e:#}");
                "internal error".to_string()
            }
            FederationError::Store(e) if status.is_server_error() => {
                tracing::error!("Store error: {e}");
                "storage failure".to_string()
            }
            FederationError::AuthenticationRejected(rejection) => rejection.to_string(),
            other => other.to_string(),
        };

        (status, Json(json!({ "error": self.code(), "message": message }))).into_response()
    }
}
