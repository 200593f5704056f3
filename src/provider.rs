//! Data Provider
//!
//! The one read entry point for request handlers. Each call resolves the
//! company's residency for the entity type, then reads from exactly one side:
//! a response never mixes local and Platform records.
//!
//! Lists come back empty rather than failing; single lookups return `None`
//! for "not found". Nothing here writes.

use serde::Serialize;

use crate::artifacts::ArtifactUrlRewriter;
use crate::context::FederationContext;
use crate::local::LocalStoreAdapter;
use crate::model::{CanonicalRecord, DataResidency, EntityType};
use crate::platform::{PlatformAdapter, PlatformClient};
use crate::residency::{ResidencyDecision, ResidencyResolver};

/// One list call's result with the side that served it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Listing {
    pub source: DataResidency,
    pub records: Vec<CanonicalRecord>,
}

/// Counts for a company overview. Each count is fetched independently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub company_id: String,
    pub employees: usize,
    pub visitors: usize,
    pub entities: usize,
}

#[derive(Clone)]
pub struct DataProvider {
    local: LocalStoreAdapter,
    platform: PlatformAdapter,
    resolver: ResidencyResolver,
    rewriter: Option<ArtifactUrlRewriter>,
}

impl DataProvider {
    pub fn new(ctx: &FederationContext) -> Self {
        let platform_client = PlatformClient::new(ctx);
        let rewriter = ctx.config.public_base_url.as_ref().map(|base| {
            ArtifactUrlRewriter::new(base.clone()).with_external_origin(&ctx.config.platform_base_url)
        });
        Self::from_parts(
            LocalStoreAdapter::new(ctx.store.clone()),
            PlatformAdapter::new(platform_client),
            rewriter,
        )
    }

    pub fn from_parts(
        local: LocalStoreAdapter,
        platform: PlatformAdapter,
        rewriter: Option<ArtifactUrlRewriter>,
    ) -> Self {
        let resolver = ResidencyResolver::new(platform.mapper().clone());
        Self {
            local,
            platform,
            resolver,
            rewriter,
        }
    }

    /// A provider whose Platform calls forward the end user's session token.
    pub fn with_session_token(&self, token: impl Into<String>) -> Self {
        let client = self.platform.client().with_session_token(token);
        Self::from_parts(self.local.clone(), PlatformAdapter::new(client), self.rewriter.clone())
    }

    pub fn resolver(&self) -> &ResidencyResolver {
        &self.resolver
    }

    pub async fn get_employees(&self, company_id: &str) -> Vec<CanonicalRecord> {
        self.list(company_id, EntityType::Employee).await.records
    }

    pub async fn get_employee_by_id(&self, id: &str, company_id: &str) -> Option<CanonicalRecord> {
        self.get_actor(id, company_id, EntityType::Employee).await
    }

    pub async fn get_visitors(&self, company_id: &str) -> Vec<CanonicalRecord> {
        self.list(company_id, EntityType::Visitor).await.records
    }

    pub async fn get_visitor_by_id(&self, id: &str, company_id: &str) -> Option<CanonicalRecord> {
        self.get_actor(id, company_id, EntityType::Visitor).await
    }

    pub async fn get_entities(
        &self,
        company_id: &str,
        types: Option<&[String]>,
    ) -> Vec<CanonicalRecord> {
        self.list_entities(company_id, types).await.records
    }

    /// List any entity type, reporting which side answered.
    pub async fn list(&self, company_id: &str, entity_type: EntityType) -> Listing {
        match entity_type {
            EntityType::Location => self.list_entities(company_id, None).await,
            _ => self.list_actors(company_id, entity_type).await,
        }
    }

    /// Records this application holds locally, regardless of residency.
    /// Serves the Platform's own pulls of app-owned data.
    pub async fn local_records(
        &self,
        company_id: &str,
        entity_type: EntityType,
    ) -> Vec<CanonicalRecord> {
        let mut records = match entity_type {
            EntityType::Location => self.local.list_entities(company_id, None).await,
            _ => self.local.list(company_id, entity_type).await,
        };
        if let Some(rewriter) = &self.rewriter {
            rewriter.rewrite_by_model(&mut records);
        }
        records
    }

    /// Employee, visitor and entity counts, fetched concurrently. A failing
    /// source contributes zero; it never sinks the other counts.
    pub async fn company_summary(&self, company_id: &str) -> CompanySummary {
        let (employees, visitors, entities) = tokio::join!(
            self.get_employees(company_id),
            self.get_visitors(company_id),
            self.get_entities(company_id, None),
        );
        CompanySummary {
            company_id: company_id.to_string(),
            employees: employees.len(),
            visitors: visitors.len(),
            entities: entities.len(),
        }
    }

    async fn list_entities(&self, company_id: &str, types: Option<&[String]>) -> Listing {
        let decision = self.resolver.decide(company_id, EntityType::Location).await;
        let mut records = match decision.mode {
            DataResidency::App => self.local.list_entities(company_id, types).await,
            DataResidency::Platform => self.platform.list_entities(company_id, types).await,
        };
        self.finish(&decision, &mut records);
        Listing {
            source: decision.mode,
            records,
        }
    }

    async fn list_actors(&self, company_id: &str, entity_type: EntityType) -> Listing {
        let decision = self.resolver.decide(company_id, entity_type).await;
        let mut records = match decision.mode {
            DataResidency::App => self.local.list(company_id, entity_type).await,
            DataResidency::Platform => {
                self.platform
                    .list_actors(company_id, decision.remote_type(), None)
                    .await
            }
        };
        self.finish(&decision, &mut records);
        Listing {
            source: decision.mode,
            records,
        }
    }

    async fn get_actor(
        &self,
        id: &str,
        company_id: &str,
        entity_type: EntityType,
    ) -> Option<CanonicalRecord> {
        let decision = self.resolver.decide(company_id, entity_type).await;
        let record = match decision.mode {
            DataResidency::App => self.local.get_by_id(id, company_id, entity_type).await,
            DataResidency::Platform => {
                self.platform
                    .get_actor_by_id(id, company_id, decision.remote_type())
                    .await
            }
        };
        let mut records: Vec<_> = record.into_iter().collect();
        self.finish(&decision, &mut records);
        records.pop()
    }

    fn finish(&self, decision: &ResidencyDecision, records: &mut [CanonicalRecord]) {
        debug_assert!(records.iter().all(|r| r.data_residency == decision.mode));
        if let Some(rewriter) = &self.rewriter {
            rewriter.rewrite_by_model(records);
        }
        tracing::debug!(
            company_id = %decision.company_id,
            entity_type = %decision.entity_type,
            mode = %decision.mode,
            count = records.len(),
            "Resolved records"
        );
    }
}
