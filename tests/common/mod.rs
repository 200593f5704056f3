//! Shared fixtures: an in-process stand-in for the Platform API and helpers
//! to build a context pointed at it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use visitor_federation::store::{MemoryBlobStore, MemoryDocumentStore};
use visitor_federation::{FederationConfig, FederationContext};

pub const APP_ID: &str = "vms";
pub const OUT_SECRET: &str = "outbound-test-secret";
pub const IN_SECRET: &str = "federation-test-secret";
/// Stored as a plain string on some documents and a typed object id on others.
pub const COMPANY: &str = "65f0c0ffee65f0c0ffee00c1";

/// One request as the stub saw it.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub body: Option<Value>,
}

#[derive(Default)]
pub struct StubState {
    /// company id → (status, body) for the installation mapping resource.
    pub mappings: HashMap<String, (u16, Value)>,
    pub actors: Vec<Value>,
    pub actor_by_id: HashMap<String, Value>,
    pub entities: Vec<Value>,
    pub entities_delay: Option<Duration>,
    /// handle → (content type, bytes) served on the artifact route.
    pub artifacts: HashMap<String, (String, Vec<u8>)>,
    pub seen: Vec<SeenRequest>,
}

type Shared = Arc<Mutex<StubState>>;

pub struct StubPlatform {
    pub base_url: String,
    state: Shared,
}

impl StubPlatform {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(StubState::default()));
        let app = Router::new()
            .route(
                "/api/v1/installations/:company/apps/:app/mappings",
                get(mapping),
            )
            .route("/api/v1/actors", get(actors))
            .route("/api/v1/actors/:id", get(actor).patch(update_actor))
            .route("/api/v1/actors/:id/artifacts", post(upload_artifact))
            .route("/api/v1/entities", get(entities))
            .route("/api/v1/artifacts/:kind/:handle", get(artifact))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn with<F: FnOnce(&mut StubState)>(&self, f: F) {
        f(&mut self.state.lock().unwrap());
    }

    pub fn set_mapping(&self, company_id: &str, status: u16, body: Value) {
        self.with(|s| {
            s.mappings.insert(company_id.to_string(), (status, body));
        });
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.state.lock().unwrap().seen.clone()
    }

    pub fn seen_paths(&self) -> Vec<String> {
        self.seen().into_iter().map(|r| r.path).collect()
    }

    pub fn config(&self) -> FederationConfig {
        FederationConfig::new(APP_ID, &self.base_url, OUT_SECRET, IN_SECRET)
    }
}

fn record(
    state: &Shared,
    method: &str,
    path: String,
    query: HashMap<String, String>,
    headers: &HeaderMap,
    body: Option<Value>,
) {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.lock().unwrap().seen.push(SeenRequest {
        method: method.to_string(),
        path,
        query,
        authorization,
        body,
    });
}

async fn mapping(
    State(state): State<Shared>,
    Path((company, app)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    record(
        &state,
        "GET",
        format!("/api/v1/installations/{company}/apps/{app}/mappings"),
        HashMap::new(),
        &headers,
        None,
    );
    let found = state.lock().unwrap().mappings.get(&company).cloned();
    match found {
        Some((status, body)) => (
            StatusCode::from_u16(status).unwrap(),
            Json(body),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn actors(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    record(&state, "GET", "/api/v1/actors".into(), query.clone(), &headers, None);
    let wanted = query.get("type").cloned();
    let actors: Vec<Value> = state
        .lock()
        .unwrap()
        .actors
        .iter()
        .filter(|a| match (&wanted, a.get("type").and_then(Value::as_str)) {
            (Some(wanted), Some(t)) => wanted == t,
            _ => true,
        })
        .cloned()
        .collect();
    Json(json!({ "data": actors }))
}

async fn actor(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    record(&state, "GET", format!("/api/v1/actors/{id}"), query, &headers, None);
    let found = state.lock().unwrap().actor_by_id.get(&id).cloned();
    match found {
        Some(actor) => Json(json!({ "data": actor })).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn update_actor(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(patch): Json<Value>,
) -> Response {
    record(
        &state,
        "PATCH",
        format!("/api/v1/actors/{id}"),
        query,
        &headers,
        Some(patch.clone()),
    );
    let mut guard = state.lock().unwrap();
    let Some(actor) = guard.actor_by_id.get_mut(&id) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    if let (Some(target), Some(fields)) = (actor.as_object_mut(), patch.as_object()) {
        for (k, v) in fields {
            target.insert(k.clone(), v.clone());
        }
    }
    Json(json!({ "data": actor.clone() })).into_response()
}

async fn upload_artifact(
    State(state): State<Shared>,
    Path(id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Json<Value> {
    record(
        &state,
        "POST",
        format!("/api/v1/actors/{id}/artifacts"),
        query,
        &headers,
        Some(body),
    );
    Json(json!({
        "data": {
            "status": "ready",
            "id": format!("{id}-art"),
            "downloadUrl": format!("/files/{id}-art"),
            "checksum": "abc"
        }
    }))
}

async fn entities(
    State(state): State<Shared>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Json<Value> {
    record(&state, "GET", "/api/v1/entities".into(), query, &headers, None);
    let (delay, entities) = {
        let guard = state.lock().unwrap();
        (guard.entities_delay, guard.entities.clone())
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    Json(Value::Array(entities))
}

async fn artifact(
    State(state): State<Shared>,
    Path((kind, handle)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    record(
        &state,
        "GET",
        format!("/api/v1/artifacts/{kind}/{handle}"),
        HashMap::new(),
        &headers,
        None,
    );
    let found = state.lock().unwrap().artifacts.get(&handle).cloned();
    match found {
        Some((content_type, bytes)) => {
            ([(axum::http::header::CONTENT_TYPE, content_type)], bytes).into_response()
        }
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn context_with(config: FederationConfig, store: MemoryDocumentStore) -> FederationContext {
    FederationContext::new(config, Arc::new(store), Arc::new(MemoryBlobStore::new())).unwrap()
}

/// Local documents for [`COMPANY`]: two employees, one visitor, one location,
/// plus an employee of another company.
pub fn seeded_store() -> MemoryDocumentStore {
    MemoryDocumentStore::from_json(json!({
        "employees": [
            {"_id": "le1", "name": "Local One", "companyId": COMPANY, "code": "L-1"},
            {"_id": "le2", "name": "Local Two", "companyId": {"$oid": COMPANY}},
            {"_id": "le3", "name": "Elsewhere", "companyId": "other"}
        ],
        "visitors": [
            {
                "_id": "v1",
                "name": "Guest",
                "companyId": COMPANY,
                "phone": "555",
                "artifacts": {"photo": {"status": "ready", "downloadUrl": "/uploads/v1-face.jpg"}}
            }
        ],
        "locations": [
            {"_id": "loc1", "name": "Lobby", "type": "building", "companyId": COMPANY}
        ]
    }))
    .unwrap()
}
