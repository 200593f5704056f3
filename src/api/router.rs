//! Router construction for the federation server.

use std::sync::Arc;

use axum::http::Method;
use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::middleware::{relaxed_federation_auth, strict_federation_auth};
use super::ApiState;
use crate::context::FederationContext;

/// Build the full axum router with all routes and middleware.
pub fn build_router(ctx: FederationContext) -> Router {
    let state = Arc::new(ApiState::new(ctx));

    // Platform pulls of app-owned data
    let strict = Router::new()
        .route(
            "/api/federation/visitors",
            get(handlers::federation::list_visitors),
        )
        .route(
            "/api/federation/employees",
            get(handlers::federation::list_employees),
        )
        .layer(axum_mw::from_fn(strict_federation_auth));

    // Forwarding endpoints
    let relaxed = Router::new()
        .route(
            "/api/federation/actors",
            get(handlers::federation::list_actors),
        )
        .route(
            "/api/federation/attendance",
            post(handlers::federation::ingest_attendance),
        )
        .layer(axum_mw::from_fn(relaxed_federation_auth));

    // Artifact links end up in <img> tags on other origins
    let artifacts = Router::new()
        .route(
            "/api/artifacts/:kind/:handle",
            get(handlers::artifacts::get_artifact),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET]),
        );

    let public = Router::new().route("/health", get(handlers::health::health));

    public
        .merge(artifacts)
        .merge(strict)
        .merge(relaxed)
        .layer(TraceLayer::new_for_http())
        .layer(Extension(state))
}
