//! Platform integration
//!
//! - [`client`]: authenticated HTTP transport (outbound credentials, reads, writes)
//! - [`adapter`]: canonical-record reads that degrade to empty on failure
//! - [`sync`]: write-side artifact push that reuses the same credentials
//! - [`types`]: wire shapes, including both installation-mapping formats

pub mod adapter;
pub mod client;
pub mod sync;
pub mod types;

pub use adapter::PlatformAdapter;
pub use client::PlatformClient;
