//! Residency Resolver
//!
//! Decides per (company, entity type) which system of record is authoritative.
//! Decisions are recomputed on every call so a mapping change on the Platform
//! side applies to the very next request.
//!
//! Visitor data never migrates: visitors resolve to `app` without consulting
//! configuration. Any failure to load configuration also resolves to `app`,
//! so a federation outage degrades to local-only instead of taking reads down.

use serde::Serialize;

use crate::mapping::EntityTypeMapper;
use crate::model::{DataResidency, EntityType};

/// The outcome for one (company, entity type) pair. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResidencyDecision {
    pub company_id: String,
    pub entity_type: EntityType,
    pub mode: DataResidency,
    /// Remote type strings configured for the entity type, when Platform-sourced.
    pub remote_types: Vec<String>,
}

impl ResidencyDecision {
    fn app(company_id: &str, entity_type: EntityType) -> Self {
        Self {
            company_id: company_id.to_string(),
            entity_type,
            mode: DataResidency::App,
            remote_types: Vec::new(),
        }
    }

    /// The type string to ask Platform for: the first configured remote type,
    /// else the local concept name.
    pub fn remote_type(&self) -> &str {
        self.remote_types
            .first()
            .map(String::as_str)
            .unwrap_or_else(|| self.entity_type.as_str())
    }
}

#[derive(Clone)]
pub struct ResidencyResolver {
    mapper: EntityTypeMapper,
}

impl ResidencyResolver {
    pub fn new(mapper: EntityTypeMapper) -> Self {
        Self { mapper }
    }

    pub async fn resolve(&self, company_id: &str, entity_type: EntityType) -> DataResidency {
        self.decide(company_id, entity_type).await.mode
    }

    pub async fn decide(&self, company_id: &str, entity_type: EntityType) -> ResidencyDecision {
        if entity_type == EntityType::Visitor {
            return ResidencyDecision::app(company_id, entity_type);
        }

        let config = match self.mapper.load_config(company_id).await {
            Ok(Some(config)) => config,
            Ok(None) => {
                tracing::debug!(company_id, %entity_type, "No installation mapping, residency=app");
                return ResidencyDecision::app(company_id, entity_type);
            }
            Err(e) => {
                tracing::warn!(company_id, %entity_type, "Residency defaulting to app: {e}");
                return ResidencyDecision::app(company_id, entity_type);
            }
        };

        match config.allowed_types(entity_type) {
            Some(remote_types) => {
                tracing::debug!(company_id, %entity_type, "Residency=platform");
                ResidencyDecision {
                    company_id: company_id.to_string(),
                    entity_type,
                    mode: DataResidency::Platform,
                    remote_types,
                }
            }
            None => ResidencyDecision::app(company_id, entity_type),
        }
    }
}
