//! Federated data endpoints.
//!
//! Strict tier: `GET /api/federation/visitors`, `GET /api/federation/employees`.
//! The company scope comes from the verified token, never from the query.
//!
//! Relaxed tier: `GET /api/federation/actors`, `POST /api/federation/attendance`.

use std::sync::Arc;

use axum::extract::Query;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::api::error::AppError;
use crate::api::ApiState;
use crate::background::touch_client_last_seen;
use crate::error::FederationError;
use crate::model::{CanonicalRecord, DataResidency, EntityType};
use crate::store::Document;
use crate::trust::{FederatedQueryClaims, RelaxedCredential};

pub const ATTENDANCE_COLLECTION: &str = "attendance";

const DEFAULT_PAGE_LIMIT: usize = 100;
const MAX_PAGE_LIMIT: usize = 1000;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedPage {
    pub data: Vec<CanonicalRecord>,
    pub count: usize,
    pub total_count: usize,
    pub source: DataResidency,
    pub data_type: &'static str,
    pub offset: usize,
    pub limit: usize,
}

pub async fn list_visitors(
    Extension(state): Extension<Arc<ApiState>>,
    Extension(claims): Extension<FederatedQueryClaims>,
    Query(page): Query<PageQuery>,
) -> Json<FederatedPage> {
    Json(local_page(&state, claims, EntityType::Visitor, page).await)
}

pub async fn list_employees(
    Extension(state): Extension<Arc<ApiState>>,
    Extension(claims): Extension<FederatedQueryClaims>,
    Query(page): Query<PageQuery>,
) -> Json<FederatedPage> {
    Json(local_page(&state, claims, EntityType::Employee, page).await)
}

async fn local_page(
    state: &ApiState,
    claims: FederatedQueryClaims,
    entity_type: EntityType,
    page: PageQuery,
) -> FederatedPage {
    let records = state
        .provider
        .local_records(&claims.company_id, entity_type)
        .await;

    let total_count = records.len();
    let offset = page.offset.unwrap_or(0);
    let limit = page
        .limit
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT);
    let data: Vec<_> = records.into_iter().skip(offset).take(limit).collect();

    touch_client_last_seen(state.ctx.store.clone(), claims.sub, claims.company_id);

    FederatedPage {
        count: data.len(),
        data,
        total_count,
        source: DataResidency::App,
        data_type: entity_type.collection(),
        offset,
        limit,
    }
}

#[derive(Debug, Deserialize)]
pub struct ActorsQuery {
    #[serde(rename = "companyId")]
    pub company_id: Option<String>,
    #[serde(rename = "type")]
    pub actor_type: Option<String>,
}

pub async fn list_actors(
    Extension(state): Extension<Arc<ApiState>>,
    Extension(credential): Extension<RelaxedCredential>,
    Query(query): Query<ActorsQuery>,
) -> Result<Json<Value>, AppError> {
    let company_id = query
        .company_id
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| FederationError::InvalidInput("companyId is required".into()))?;
    let raw_type = query.actor_type.as_deref().unwrap_or("employee");
    let entity_type = EntityType::parse(raw_type)
        .ok_or_else(|| FederationError::InvalidInput(format!("unknown actor type `{raw_type}`")))?;

    let listing = state
        .provider
        .with_session_token(credential.token)
        .list(&company_id, entity_type)
        .await;

    Ok(Json(json!({
        "count": listing.records.len(),
        "data": listing.records,
        "source": listing.source,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceBatch {
    pub company_id: String,
    #[serde(alias = "rows")]
    pub records: Vec<Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceAccepted {
    pub accepted: usize,
    pub batch_id: Uuid,
    pub source: DataResidency,
}

pub async fn ingest_attendance(
    Extension(state): Extension<Arc<ApiState>>,
    Json(batch): Json<AttendanceBatch>,
) -> Result<(StatusCode, Json<AttendanceAccepted>), AppError> {
    if batch.company_id.trim().is_empty() {
        return Err(FederationError::InvalidInput("companyId is required".into()).into());
    }

    let batch_id = Uuid::new_v4();
    let received_at = Utc::now().to_rfc3339();
    let docs = batch
        .records
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let Value::Object(mut doc) = record else {
                return Err(FederationError::InvalidInput(format!(
                    "attendance record {index} is not an object"
                )));
            };
            doc.entry("companyId")
                .or_insert_with(|| json!(batch.company_id));
            doc.insert("batchId".into(), json!(batch_id));
            doc.insert("receivedAt".into(), json!(received_at));
            doc.insert("source".into(), json!(DataResidency::Platform));
            Ok(doc)
        })
        .collect::<Result<Vec<Document>, _>>()?;

    let accepted = if docs.is_empty() {
        0
    } else {
        state
            .ctx
            .store
            .insert_many(ATTENDANCE_COLLECTION, docs)
            .await?
    };
    tracing::info!(
        company_id = %batch.company_id,
        %batch_id,
        accepted,
        "Attendance batch ingested"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(AttendanceAccepted {
            accepted,
            batch_id,
            source: DataResidency::Platform,
        }),
    ))
}
