//! Local Store Adapter
//!
//! Reads employees, visitors and locations from the local document store and
//! tags them `app`. Company identifiers exist in the store both as typed
//! object ids and as plain strings, so every query matches on both.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::model::{
    artifact_map, bool_field, first_string, CanonicalRecord, DataResidency, EntityType,
};
use crate::store::{Document, DocumentStore, Filter};

const COMPANY_FIELD: &str = "companyId";
const ID_FIELD: &str = "_id";
const CODE_FIELDS: &[&str] = &["code", "employeeCode", "visitorCode"];

#[derive(Clone)]
pub struct LocalStoreAdapter {
    store: Arc<dyn DocumentStore>,
}

impl LocalStoreAdapter {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, company_id: &str, entity_type: EntityType) -> Vec<CanonicalRecord> {
        self.find(entity_type, company_id, company_filter(company_id))
            .await
    }

    pub async fn get_by_id(
        &self,
        id: &str,
        company_id: &str,
        entity_type: EntityType,
    ) -> Option<CanonicalRecord> {
        let by_id = company_filter(company_id).any_of(ID_FIELD, id_variants(id));
        if let Some(record) = self.find(entity_type, company_id, by_id).await.into_iter().next() {
            return Some(record);
        }

        // Business codes are a fallback key, checked field by field.
        for field in CODE_FIELDS {
            let by_code = company_filter(company_id).eq(*field, id);
            if let Some(record) = self
                .find(entity_type, company_id, by_code)
                .await
                .into_iter()
                .next()
            {
                return Some(record);
            }
        }
        None
    }

    pub async fn list_entities(
        &self,
        company_id: &str,
        types: Option<&[String]>,
    ) -> Vec<CanonicalRecord> {
        let mut filter = company_filter(company_id);
        if let Some(types) = types {
            if types.is_empty() {
                return Vec::new();
            }
            filter = filter.any_of("type", types.iter().map(|t| json!(t)).collect());
        }
        self.find(EntityType::Location, company_id, filter).await
    }

    async fn find(
        &self,
        entity_type: EntityType,
        company_id: &str,
        filter: Filter,
    ) -> Vec<CanonicalRecord> {
        match self.store.find(entity_type.collection(), &filter).await {
            Ok(docs) => docs
                .into_iter()
                .filter_map(|doc| to_canonical(doc, company_id))
                .collect(),
            Err(e) => {
                tracing::warn!(
                    company_id,
                    collection = entity_type.collection(),
                    "Local store query failed: {e}"
                );
                Vec::new()
            }
        }
    }
}

/// Filter matching a company under either identifier representation.
pub fn company_filter(company_id: &str) -> Filter {
    Filter::new().any_of(COMPANY_FIELD, id_variants(company_id))
}

/// The plain string, plus the typed object id form when the value is a valid
/// 24-hex object id.
pub fn id_variants(id: &str) -> Vec<Value> {
    let mut variants = vec![Value::String(id.to_string())];
    if is_object_id(id) {
        variants.push(json!({ "$oid": id.to_ascii_lowercase() }));
        if id.chars().any(|c| c.is_ascii_uppercase()) {
            variants.push(Value::String(id.to_ascii_lowercase()));
        }
    }
    variants
}

fn is_object_id(id: &str) -> bool {
    id.len() == 24 && id.chars().all(|c| c.is_ascii_hexdigit())
}

fn to_canonical(doc: Document, company_id: &str) -> Option<CanonicalRecord> {
    let doc = Value::Object(doc);
    let id = first_string(&doc, &[ID_FIELD, "id"]).or_else(|| first_string(&doc, CODE_FIELDS));
    let Some(id) = id else {
        tracing::warn!(company_id, "Skipping local document without identifier");
        return None;
    };

    let display_name = first_string(&doc, &["name", "fullName", "displayName"])
        .or_else(|| first_string(&doc, CODE_FIELDS))
        .unwrap_or_else(|| id.clone());

    Some(CanonicalRecord {
        display_name,
        phone: first_string(&doc, &["phone", "mobile"]),
        email: first_string(&doc, &["email"]),
        status: first_string(&doc, &["status"]).unwrap_or_else(|| "active".to_string()),
        blacklisted: bool_field(&doc, &["blacklisted", "isBlacklisted"]),
        company_id: first_string(&doc, &[COMPANY_FIELD]).unwrap_or_else(|| company_id.to_string()),
        data_residency: DataResidency::App,
        source_id: None,
        artifacts: artifact_map(&doc),
        id,
        attributes: doc,
    })
}
