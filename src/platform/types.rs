//! Platform wire types.
//!
//! Actor and entity payloads are kept as raw JSON: remote schemas drift
//! between Platform versions and the original object is preserved under
//! `attributes` anyway. Only the installation mapping gets typed, because it
//! drives residency decisions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The installation-mapping resource in either of its historical shapes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum InstallationMapping {
    /// `[{"sourceType": "Platform", "targetType": "building", "appEntity": "location"}, ...]`
    Entries(Vec<MappingEntry>),
    /// `{"location": ["building", "floor"], "employee": {"targetType": "staff"}}`
    ByConcept(BTreeMap<String, ConceptMapping>),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingEntry {
    #[serde(alias = "source")]
    pub source_type: String,
    #[serde(alias = "platformType")]
    pub target_type: String,
    /// Local concept the entry applies to. Older entries omit it and always
    /// meant locations.
    #[serde(default, alias = "appType")]
    pub app_entity: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ConceptMapping {
    Types(Vec<String>),
    Legacy(LegacyConceptMapping),
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyConceptMapping {
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Body of `POST /api/v1/actors/{id}/artifacts`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactUpload<'a> {
    pub model: &'a str,
    pub content_type: &'a str,
    /// Base64 of the raw bytes.
    pub data: String,
}

/// Unwrap a list response. Platform versions answer with a bare array, a
/// `{data: [...]}` envelope, or `{items: [...]}`.
pub fn into_items(body: Value) -> Vec<Value> {
    match body {
        Value::Array(items) => items,
        Value::Object(mut map) => ["data", "items", "results"]
            .iter()
            .find_map(|key| match map.remove(*key) {
                Some(Value::Array(items)) => Some(items),
                _ => None,
            })
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Unwrap a single-object response (`{data: {...}}` or the bare object).
pub fn into_item(body: Value) -> Option<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner @ Value::Object(_)) => Some(inner),
            Some(_) => None,
            None => Some(Value::Object(map)),
        },
        _ => None,
    }
}
