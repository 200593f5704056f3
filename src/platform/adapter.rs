//! Platform Client Adapter
//!
//! Reads actors and entities from Platform and turns them into
//! [`CanonicalRecord`]s. Every failure (network, timeout, non-2xx, bad body)
//! is logged and becomes an empty list or `None`. Callers that fan out to
//! several sources rely on this never erroring.

use serde_json::Value;

use super::client::PlatformClient;
use crate::mapping::EntityTypeMapper;
use crate::model::{artifact_map, bool_field, first_string, CanonicalRecord, DataResidency};

// Candidate keys, in priority order. Remote schemas differ between Platform
// versions; the first populated key wins.
const NAME_KEYS: &[&str] = &["name", "displayName", "fullName"];
const CODE_KEYS: &[&str] = &["code", "actorCode", "employeeCode", "visitorCode"];
const ID_KEYS: &[&str] = &["_id", "id"];
const TYPE_KEYS: &[&str] = &["type", "entityType", "actorType"];

const UNNAMED: &str = "Unnamed";

#[derive(Clone)]
pub struct PlatformAdapter {
    client: PlatformClient,
    mapper: EntityTypeMapper,
}

impl PlatformAdapter {
    pub fn new(client: PlatformClient) -> Self {
        let mapper = EntityTypeMapper::new(client.clone());
        Self { client, mapper }
    }

    pub fn client(&self) -> &PlatformClient {
        &self.client
    }

    pub fn mapper(&self) -> &EntityTypeMapper {
        &self.mapper
    }

    pub async fn list_actors(
        &self,
        company_id: &str,
        actor_type: &str,
        status: Option<&str>,
    ) -> Vec<CanonicalRecord> {
        match self.client.fetch_actors(company_id, actor_type, status).await {
            Ok(items) => items
                .into_iter()
                .filter_map(|raw| to_canonical(raw, company_id))
                .collect(),
            Err(e) => {
                tracing::warn!(company_id, actor_type, "Platform actor list failed: {e:#}");
                Vec::new()
            }
        }
    }

    /// Direct lookup first. The id a caller holds is often a local business
    /// code rather than Platform's key, so a miss falls back to scanning the
    /// full list.
    pub async fn get_actor_by_id(
        &self,
        id: &str,
        company_id: &str,
        actor_type: &str,
    ) -> Option<CanonicalRecord> {
        match self.client.fetch_actor(id, company_id).await {
            Ok(Some(raw)) => {
                if let Some(record) = to_canonical(raw, company_id) {
                    return Some(record);
                }
            }
            Ok(None) => {
                tracing::debug!(id, company_id, "Direct actor lookup missed, scanning list");
            }
            Err(e) => {
                tracing::debug!(id, company_id, "Direct actor lookup failed, scanning list: {e:#}");
            }
        }

        let items = match self.client.fetch_actors(company_id, actor_type, None).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(id, company_id, "Platform actor scan failed: {e:#}");
                return None;
            }
        };
        items
            .into_iter()
            .find(|raw| matches_identifier(raw, id))
            .and_then(|raw| to_canonical(raw, company_id))
    }

    /// Entities of the allowed types only. An explicit `types` filter wins
    /// over the company's mapping; with neither, nothing is filtered.
    pub async fn list_entities(
        &self,
        company_id: &str,
        types: Option<&[String]>,
    ) -> Vec<CanonicalRecord> {
        let allowed = match types {
            Some(types) => Some(types.to_vec()),
            None => self.mapper.resolve_allowed_types(company_id).await,
        };
        if allowed.as_ref().is_some_and(Vec::is_empty) {
            return Vec::new();
        }

        let items = match self.client.fetch_entities(company_id, allowed.as_deref()).await {
            Ok(items) => items,
            Err(e) => {
                tracing::warn!(company_id, "Platform entity list failed: {e:#}");
                return Vec::new();
            }
        };

        items
            .into_iter()
            .filter(|raw| match &allowed {
                Some(allowed) => first_string(raw, TYPE_KEYS)
                    .is_some_and(|t| allowed.iter().any(|a| a == &t)),
                None => true,
            })
            .filter_map(|raw| to_canonical(raw, company_id))
            .collect()
    }
}

/// Normalize one remote actor or entity. Returns `None` only when the record
/// has no identifier at all.
pub fn to_canonical(raw: Value, company_id: &str) -> Option<CanonicalRecord> {
    let source_id = first_string(&raw, ID_KEYS);
    let code = first_string(&raw, CODE_KEYS);
    let Some(id) = code.clone().or_else(|| source_id.clone()) else {
        tracing::warn!(company_id, "Dropping Platform record without identifier");
        return None;
    };

    let display_name = display_name(&raw)
        .or(code)
        .or_else(|| source_id.clone())
        .unwrap_or_else(|| UNNAMED.to_string());

    Some(CanonicalRecord {
        id,
        display_name,
        phone: first_string(&raw, &["phone", "mobile", "phoneNumber"]),
        email: first_string(&raw, &["email", "emailAddress"]),
        status: first_string(&raw, &["status"]).unwrap_or_else(|| "active".to_string()),
        blacklisted: bool_field(&raw, &["blacklisted", "isBlacklisted"]),
        company_id: first_string(&raw, &["companyId", "company_id"])
            .unwrap_or_else(|| company_id.to_string()),
        data_residency: DataResidency::Platform,
        source_id,
        artifacts: artifact_map(&raw),
        attributes: raw,
    })
}

fn display_name(raw: &Value) -> Option<String> {
    first_string(raw, NAME_KEYS).or_else(|| {
        let first = first_string(raw, &["firstName"]);
        let last = first_string(raw, &["lastName"]);
        match (first, last) {
            (Some(f), Some(l)) => Some(format!("{f} {l}")),
            (f, l) => f.or(l),
        }
    })
}

fn normalize_code(code: &str) -> String {
    code.trim().to_lowercase()
}

/// Raw id, then normalized code, then `attributes.code`.
fn matches_identifier(raw: &Value, wanted: &str) -> bool {
    let wanted_code = normalize_code(wanted);
    if first_string(raw, ID_KEYS).as_deref() == Some(wanted) {
        return true;
    }
    if first_string(raw, CODE_KEYS).is_some_and(|c| normalize_code(&c) == wanted_code) {
        return true;
    }
    raw.get("attributes")
        .and_then(|attrs| first_string(attrs, &["code"]))
        .is_some_and(|c| normalize_code(&c) == wanted_code)
}
