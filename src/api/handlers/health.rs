//! GET /health

use std::sync::Arc;

use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::api::ApiState;

pub async fn health(Extension(state): Extension<Arc<ApiState>>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "appId": state.ctx.config.app_id,
    }))
}
