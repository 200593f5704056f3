//! HTTP contract of the federation endpoints, driven through the router with
//! `oneshot` (no socket on our side; Platform is the stub).

#![cfg(feature = "server")]

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use visitor_federation::api::build_router;
use visitor_federation::store::{
    BlobStore, DocumentStore, Filter, MemoryBlobStore, MemoryDocumentStore,
};
use visitor_federation::FederationContext;

use common::{seeded_store, StubPlatform, APP_ID, COMPANY, IN_SECRET};

struct TestApp {
    router: Router,
    store: Arc<MemoryDocumentStore>,
    blobs: Arc<MemoryBlobStore>,
    stub: StubPlatform,
}

async fn test_app() -> TestApp {
    let stub = StubPlatform::start().await;
    let store = Arc::new(seeded_store());
    let blobs = Arc::new(MemoryBlobStore::new());
    let config = stub
        .config()
        .with_public_base_url("https://local.example/api/artifacts");
    let ctx = FederationContext::new(config, store.clone(), blobs.clone()).unwrap();
    TestApp {
        router: build_router(ctx),
        store,
        blobs,
        stub,
    }
}

fn federated_token(overrides: Value) -> String {
    let mut claims = json!({
        "iss": "platform",
        "aud": APP_ID,
        "type": "federated_query",
        "company_id": COMPANY,
        "sub": "platform-sync",
        "exp": Utc::now().timestamp() + 300,
    });
    for (k, v) in overrides.as_object().unwrap() {
        claims[k] = v.clone();
    }
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(IN_SECRET.as_bytes()),
    )
    .unwrap()
}

fn strict_get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-platform-request", "true")
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

// ── Strict tier ────────────────────────────────────────────────

#[tokio::test]
async fn strict_requires_platform_header() {
    let app = test_app().await;
    let request = Request::builder()
        .uri("/api/federation/visitors")
        .header("authorization", format!("Bearer {}", federated_token(json!({}))))
        .body(Body::empty())
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_platform_header");
}

#[tokio::test]
async fn strict_rejections_carry_distinct_reasons() {
    let app = test_app().await;
    let now = Utc::now().timestamp();
    let cases = [
        (json!({"iss": "someone-else"}), "invalid_issuer"),
        (json!({"type": "session"}), "invalid_type"),
        (json!({"aud": "another-app"}), "invalid_audience"),
        (json!({"exp": now - 120}), "token_expired"),
    ];

    for (overrides, reason) in cases {
        let token = federated_token(overrides);
        let (status, body) = send(&app.router, strict_get("/api/federation/employees", &token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{reason}");
        assert_eq!(body["error"], reason);
    }

    let (status, body) = send(&app.router, strict_get("/api/federation/employees", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn strict_tolerates_small_clock_skew() {
    let app = test_app().await;
    let token = federated_token(json!({"exp": Utc::now().timestamp() - 30}));
    let (status, _) = send(&app.router, strict_get("/api/federation/visitors", &token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn strict_visitors_envelope() {
    let app = test_app().await;
    let token = federated_token(json!({}));

    let (status, body) = send(&app.router, strict_get("/api/federation/visitors", &token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["source"], "app");
    assert_eq!(body["dataType"], "visitors");
    assert_eq!(body["offset"], 0);
    assert_eq!(body["limit"], 100);
    assert_eq!(body["data"][0]["displayName"], "Guest");
    assert_eq!(body["data"][0]["dataResidency"], "app");
    assert_eq!(
        body["data"][0]["artifacts"]["photo"]["downloadUrl"],
        "https://local.example/api/artifacts/images/v1-face.jpg"
    );
    // strict endpoints never reach out to Platform
    assert!(app.stub.seen().is_empty());
}

#[tokio::test]
async fn strict_employees_are_paged_and_scoped_to_token_company() {
    let app = test_app().await;
    let token = federated_token(json!({}));

    let (status, body) = send(
        &app.router,
        strict_get("/api/federation/employees?offset=1&limit=1", &token),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(body["totalCount"], 2);
    assert_eq!(body["offset"], 1);
    assert_eq!(body["limit"], 1);

    let other = federated_token(json!({"company_id": "other"}));
    let (_, body) = send(&app.router, strict_get("/api/federation/employees", &other)).await;
    assert_eq!(body["totalCount"], 1);
    assert_eq!(body["data"][0]["displayName"], "Elsewhere");
}

#[tokio::test]
async fn strict_call_records_client_last_seen() {
    let app = test_app().await;
    let token = federated_token(json!({}));
    let (status, _) = send(&app.router, strict_get("/api/federation/visitors", &token)).await;
    assert_eq!(status, StatusCode::OK);

    let filter = Filter::new().eq("clientId", "platform-sync");
    let mut marker = None;
    for _ in 0..50 {
        marker = app.store.find_one("federation_clients", &filter).await.unwrap();
        if marker.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let marker = marker.expect("last-seen marker written");
    assert_eq!(marker["companyId"], COMPANY);
    assert!(marker["lastSeenAt"].is_string());
}

// ── Relaxed tier ───────────────────────────────────────────────

#[tokio::test]
async fn relaxed_requires_a_bearer() {
    let app = test_app().await;
    let request = Request::builder()
        .uri(format!("/api/federation/actors?companyId={COMPANY}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing_bearer");
}

#[tokio::test]
async fn relaxed_actors_follow_residency_and_forward_the_bearer() {
    let app = test_app().await;
    app.stub
        .set_mapping(COMPANY, 200, json!({"mappings": {"employee": ["staff"]}}));
    app.stub.with(|s| {
        s.actors = vec![json!({"_id": "p1", "name": "Asha", "type": "staff"})];
    });

    let request = Request::builder()
        .uri(format!("/api/federation/actors?companyId={COMPANY}&type=employee"))
        .header("authorization", "Bearer opaque-user-session")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "platform");
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["displayName"], "Asha");
    assert!(app
        .stub
        .seen()
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Bearer opaque-user-session")));
}

#[tokio::test]
async fn relaxed_actors_local_when_unmapped() {
    let app = test_app().await;
    let request = Request::builder()
        .uri(format!("/api/federation/actors?companyId={COMPANY}&type=visitors"))
        .header("authorization", "Bearer anything")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "app");
    assert_eq!(body["count"], 1);
}

#[tokio::test]
async fn relaxed_actors_validate_query() {
    let app = test_app().await;
    for uri in [
        "/api/federation/actors".to_string(),
        format!("/api/federation/actors?companyId={COMPANY}&type=vehicle"),
    ] {
        let request = Request::builder()
            .uri(uri)
            .header("authorization", "Bearer anything")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "invalid_input");
    }
}

#[tokio::test]
async fn attendance_batch_is_stored() {
    let app = test_app().await;
    let payload = json!({
        "companyId": COMPANY,
        "records": [
            {"actorId": "p1", "event": "in", "at": "2026-03-01T08:00:00Z"},
            {"actorId": "p1", "event": "out", "at": "2026-03-01T17:00:00Z"}
        ]
    });
    let request = Request::builder()
        .method("POST")
        .uri("/api/federation/attendance")
        .header("authorization", "Bearer anything")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();

    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["accepted"], 2);
    assert_eq!(body["source"], "platform");
    let batch_id = body["batchId"].as_str().unwrap().to_string();

    let stored = app
        .store
        .find("attendance", &Filter::new().eq("batchId", batch_id))
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored.iter().all(|d| d["companyId"] == COMPANY));
    assert!(stored.iter().all(|d| d["receivedAt"].is_string()));
}

#[tokio::test]
async fn attendance_rejects_non_object_rows() {
    let app = test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/api/federation/attendance")
        .header("authorization", "Bearer anything")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"companyId": COMPANY, "rows": [{"ok": true}, 7]}).to_string(),
        ))
        .unwrap();

    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
    assert_eq!(app.store.count("attendance").await, 0);
}

// ── Artifacts and health ───────────────────────────────────────

#[tokio::test]
async fn artifact_bytes_stream_back() {
    let app = test_app().await;
    app.blobs
        .put("v1-face.jpg", Some("image/jpeg"), b"\xff\xd8jpeg".to_vec())
        .await
        .unwrap();

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/artifacts/images/v1-face.jpg")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"\xff\xd8jpeg");
}

#[tokio::test]
async fn platform_artifact_streams_through_the_canonical_route() {
    let app = test_app().await;
    app.stub
        .set_mapping(COMPANY, 200, json!({"mappings": {"employee": ["staff"]}}));
    let platform_photo = format!("{}/files/face-p1.jpg", app.stub.base_url);
    app.stub.with(|s| {
        s.actors = vec![json!({
            "_id": "p1",
            "name": "Asha",
            "type": "staff",
            "artifacts": {"photo": {"status": "ready", "downloadUrl": platform_photo}}
        })];
        s.artifacts.insert(
            "face-p1.jpg".into(),
            ("image/jpeg".into(), b"\xff\xd8platform".to_vec()),
        );
    });

    let request = Request::builder()
        .uri(format!("/api/federation/actors?companyId={COMPANY}&type=employee"))
        .header("authorization", "Bearer anything")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    let link = body["data"][0]["artifacts"]["photo"]["downloadUrl"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(link, "https://local.example/api/artifacts/images/face-p1.jpg");

    let path = link.trim_start_matches("https://local.example");
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/jpeg");
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"\xff\xd8platform");

    let fetch = app
        .stub
        .seen()
        .into_iter()
        .find(|r| r.path == "/api/v1/artifacts/images/face-p1.jpg")
        .unwrap();
    assert!(fetch.authorization.unwrap().starts_with("Bearer "));
}

#[tokio::test]
async fn artifact_errors() {
    let app = test_app().await;
    let get = |uri: &'static str| Request::builder().uri(uri).body(Body::empty()).unwrap();

    let (status, _) = send(&app.router, get("/api/artifacts/images/absent.jpg")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app.router, get("/api/artifacts/videos/a.mp4")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app.router, get("/api/artifacts/images/.env")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_input");
}

#[tokio::test]
async fn health_is_public() {
    let app = test_app().await;
    let (status, body) = send(
        &app.router,
        Request::builder().uri("/health").body(Body::empty()).unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["appId"], APP_ID);
}
