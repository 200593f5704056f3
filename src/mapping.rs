//! Entity Type Mapper
//!
//! Turns the company's installation mapping (fetched from Platform on every
//! call) into a flat list of remote type strings per local concept. The two
//! historical payload shapes are normalized here and nowhere else.

use std::collections::BTreeMap;

use crate::error::FederationError;
use crate::model::EntityType;
use crate::platform::types::{ConceptMapping, InstallationMapping};
use crate::platform::PlatformClient;

/// Source tag marking a mapping as Platform-owned.
pub const PLATFORM_SOURCE: &str = "Platform";

/// Normalized mapping: local concept → remote type strings it covers.
///
/// A concept that is absent is not Platform-sourced and carries no type
/// restriction. A concept present with an empty list is Platform-sourced but
/// maps to nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityMappingConfig {
    concepts: BTreeMap<EntityType, Vec<String>>,
}

impl EntityMappingConfig {
    pub fn from_installation(mapping: InstallationMapping) -> Self {
        let mut concepts: BTreeMap<EntityType, Vec<String>> = BTreeMap::new();

        match mapping {
            InstallationMapping::Entries(entries) => {
                for entry in entries {
                    if !is_platform_source(&entry.source_type) {
                        continue;
                    }
                    let concept = match entry.app_entity.as_deref() {
                        None => Some(EntityType::Location),
                        Some(name) => EntityType::parse(name),
                    };
                    let Some(concept) = concept else {
                        tracing::debug!(app_entity = ?entry.app_entity, "Ignoring mapping for unknown concept");
                        continue;
                    };
                    push_unique(concepts.entry(concept).or_default(), entry.target_type);
                }
            }
            InstallationMapping::ByConcept(by_concept) => {
                for (name, mapping) in by_concept {
                    let Some(concept) = EntityType::parse(&name) else {
                        tracing::debug!(concept = %name, "Ignoring mapping for unknown concept");
                        continue;
                    };
                    let types = match mapping {
                        ConceptMapping::Types(types) => types,
                        ConceptMapping::Legacy(legacy) => {
                            if legacy
                                .source
                                .as_deref()
                                .is_some_and(|s| !is_platform_source(s))
                            {
                                continue;
                            }
                            legacy.target_type.into_iter().collect()
                        }
                    };
                    let slot = concepts.entry(concept).or_default();
                    for remote_type in types {
                        push_unique(slot, remote_type);
                    }
                }
            }
        }

        Self { concepts }
    }

    pub fn is_platform_sourced(&self, entity_type: EntityType) -> bool {
        self.concepts.contains_key(&entity_type)
    }

    /// Remote types for a concept; `None` means no restriction configured.
    pub fn allowed_types(&self, entity_type: EntityType) -> Option<Vec<String>> {
        self.concepts.get(&entity_type).cloned()
    }
}

fn is_platform_source(source: &str) -> bool {
    source.trim().eq_ignore_ascii_case(PLATFORM_SOURCE)
}

fn push_unique(types: &mut Vec<String>, remote_type: String) {
    let remote_type = remote_type.trim().to_string();
    if !remote_type.is_empty() && !types.contains(&remote_type) {
        types.push(remote_type);
    }
}

/// Fetches and normalizes installation mappings. Holds no state between calls.
#[derive(Clone)]
pub struct EntityTypeMapper {
    platform: PlatformClient,
}

impl EntityTypeMapper {
    pub fn new(platform: PlatformClient) -> Self {
        Self { platform }
    }

    /// The normalized configuration, `Ok(None)` when nothing is configured.
    pub async fn load_config(
        &self,
        company_id: &str,
    ) -> Result<Option<EntityMappingConfig>, FederationError> {
        let mapping = self
            .platform
            .fetch_installation_mapping(company_id)
            .await
            .map_err(|e| FederationError::ConfigurationUnavailable(format!("{e:#}")))?;
        Ok(mapping.map(EntityMappingConfig::from_installation))
    }

    /// Remote entity types this company federates as locations.
    ///
    /// `None` means no filtering applies (nothing configured, or the
    /// configuration could not be loaded). `Some(vec![])` means filter to
    /// nothing.
    pub async fn resolve_allowed_types(&self, company_id: &str) -> Option<Vec<String>> {
        match self.load_config(company_id).await {
            Ok(Some(config)) => config.allowed_types(EntityType::Location),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(company_id, "Entity type mapping unavailable: {e}");
                None
            }
        }
    }
}
