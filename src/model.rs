//! Canonical data model shared by every adapter.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Which system of record is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataResidency {
    App,
    Platform,
}

impl DataResidency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Platform => "platform",
        }
    }
}

impl fmt::Display for DataResidency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local concepts whose residency can be configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    Employee,
    Visitor,
    /// Sites, buildings, gates: anything the Platform calls an "entity".
    Location,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Visitor => "visitor",
            Self::Location => "location",
        }
    }

    /// Parse a concept name, accepting the plural and legacy aliases seen in
    /// installation mappings.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "employee" | "employees" | "staff" => Some(Self::Employee),
            "visitor" | "visitors" => Some(Self::Visitor),
            "location" | "locations" | "entity" | "entities" => Some(Self::Location),
            _ => None,
        }
    }

    /// Local document collection backing this concept.
    pub fn collection(&self) -> &'static str {
        match self {
            Self::Employee => "employees",
            Self::Visitor => "visitors",
            Self::Location => "locations",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The normalized record every caller receives, whichever side it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    pub id: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub status: String,
    pub blacklisted: bool,
    pub company_id: String,
    pub data_residency: DataResidency,
    /// The Platform's internal key. Only set on platform-sourced records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    /// The untouched source document. Links inside it are never rewritten;
    /// take artifact URLs from `artifacts`.
    pub attributes: Value,
    /// Model/position name → artifact descriptor (may nest).
    #[serde(default)]
    pub artifacts: Map<String, Value>,
}

/// One binary artifact (photo, embedding file) referenced by handle.
///
/// Unknown descriptor fields ride along in `extra` so rewriting never loses them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactReference {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const EMBEDDING_MODELS: &[&str] = &["facenet", "arcface", "insightface", "sface"];

/// The two kinds of artifact this application serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Images,
    Embeddings,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Embeddings => "embeddings",
        }
    }

    /// Kind served for an artifact stored under `model` in a record's
    /// artifact map. Face-embedding models hold embeddings; everything else
    /// is an image.
    pub fn for_model(model: &str) -> Self {
        let model = model.to_ascii_lowercase();
        if model.contains("embedding")
            || EMBEDDING_MODELS.iter().any(|name| model.starts_with(name))
        {
            Self::Embeddings
        } else {
            Self::Images
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "images" => Some(Self::Images),
            "embeddings" => Some(Self::Embeddings),
            _ => None,
        }
    }
}

// ============================================================================
// Field helpers shared by the local and platform transforms
// ============================================================================

/// First non-empty string among `keys`. Numbers are stringified, and a typed
/// object id (`{"$oid": "..."}`) yields its hex value.
pub(crate) fn first_string(doc: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| doc.get(*key).and_then(string_value))
}

pub(crate) fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(string_value),
        _ => None,
    }
}

pub(crate) fn bool_field(doc: &Value, keys: &[&str]) -> bool {
    keys.iter().any(|key| match doc.get(*key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

pub(crate) fn artifact_map(doc: &Value) -> Map<String, Value> {
    doc.get("artifacts")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default()
}
