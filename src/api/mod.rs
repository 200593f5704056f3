//! Inbound HTTP surface: federated data endpoints, artifact streaming, health.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;

use crate::context::FederationContext;
use crate::platform::PlatformClient;
use crate::provider::DataProvider;
use crate::trust::TrustVerifier;

pub use router::build_router;

/// Shared by every handler through an `Extension<Arc<ApiState>>`.
pub struct ApiState {
    pub ctx: FederationContext,
    pub provider: DataProvider,
    /// Serves artifact bytes this application does not hold locally.
    pub platform: PlatformClient,
    pub verifier: TrustVerifier,
}

impl ApiState {
    pub fn new(ctx: FederationContext) -> Self {
        let provider = DataProvider::new(&ctx);
        let platform = PlatformClient::new(&ctx);
        let verifier = TrustVerifier::new(&ctx.config);
        Self {
            ctx,
            provider,
            platform,
            verifier,
        }
    }
}
