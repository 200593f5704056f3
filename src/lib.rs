//! Residency resolution and federated data access.
//!
//! Decides, per company and entity type, whether this application or the
//! external Platform owns the data, fetches from whichever side is
//! authoritative, and hands back one canonical record shape.
//!
//! ## Layout
//!
//! - [`mapping`]: installation-mapping normalization (Entity Type Mapper)
//! - [`residency`]: per (company, entity type) system-of-record decision
//! - [`platform`]: outbound Platform client and record adapter
//! - [`local`]: local document-store adapter
//! - [`provider`]: the read facade used by request handlers
//! - [`artifacts`]: same-origin artifact URL rewriting
//! - [`trust`]: inbound federated request verification
//! - [`api`]: axum endpoints (feature `server`)

pub mod artifacts;
pub mod background;
pub mod config;
pub mod context;
pub mod error;
pub mod local;
pub mod mapping;
pub mod model;
pub mod platform;
pub mod provider;
pub mod residency;
pub mod store;
pub mod trust;

#[cfg(feature = "server")]
pub mod api;

pub use config::FederationConfig;
pub use context::FederationContext;
pub use error::{AuthRejection, FederationError};
pub use model::{CanonicalRecord, DataResidency, EntityType};
pub use provider::DataProvider;
