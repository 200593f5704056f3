//! Federation configuration
//!
//! Read from environment variables at process start:
//!   FEDERATION_APP_ID           — this application's identifier (required)
//!   PLATFORM_BASE_URL           — Platform origin (required)
//!   PLATFORM_JWT_SECRET         — HMAC secret for self-issued outbound tokens (required)
//!   FEDERATION_JWT_SECRET       — HMAC secret for inbound strict-tier tokens (required)
//!   FEDERATION_ISSUER           — expected inbound issuer (default: platform)
//!   APP_PUBLIC_BASE_URL         — artifact route base, e.g. https://app.example/api/artifacts (optional)
//!   PLATFORM_TIMEOUT_MS         — outbound call timeout (default: 8000)
//!   ARTIFACT_UPLOAD_LIMIT_BYTES — inline artifact ceiling (default: 5 MiB)

use std::time::Duration;

use anyhow::{anyhow, Context, Result};

const DEFAULT_ISSUER: &str = "platform";
const DEFAULT_TIMEOUT_MS: u64 = 8_000;
const DEFAULT_UPLOAD_LIMIT: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FederationConfig {
    pub app_id: String,
    pub platform_base_url: String,
    pub platform_jwt_secret: String,
    pub federation_jwt_secret: String,
    pub federation_issuer: String,
    pub public_base_url: Option<String>,
    pub platform_timeout: Duration,
    pub upload_limit_bytes: usize,
}

impl FederationConfig {
    /// Minimal config with defaults for everything optional.
    pub fn new(
        app_id: impl Into<String>,
        platform_base_url: impl Into<String>,
        platform_jwt_secret: impl Into<String>,
        federation_jwt_secret: impl Into<String>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            platform_base_url: trim_base(platform_base_url.into()),
            platform_jwt_secret: platform_jwt_secret.into(),
            federation_jwt_secret: federation_jwt_secret.into(),
            federation_issuer: DEFAULT_ISSUER.to_string(),
            public_base_url: None,
            platform_timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            upload_limit_bytes: DEFAULT_UPLOAD_LIMIT,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` is this over `std::env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow!("{key} must be set"))
        };

        let mut config = Self::new(
            required("FEDERATION_APP_ID")?,
            required("PLATFORM_BASE_URL")?,
            required("PLATFORM_JWT_SECRET")?,
            required("FEDERATION_JWT_SECRET")?,
        );

        url::Url::parse(&config.platform_base_url)
            .with_context(|| format!("PLATFORM_BASE_URL is not a URL: {}", config.platform_base_url))?;

        if let Some(issuer) = lookup("FEDERATION_ISSUER") {
            config.federation_issuer = issuer;
        }
        if let Some(base) = lookup("APP_PUBLIC_BASE_URL").filter(|v| !v.is_empty()) {
            config.public_base_url = Some(trim_base(base));
        }
        if let Some(ms) = lookup("PLATFORM_TIMEOUT_MS") {
            let ms: u64 = ms
                .parse()
                .with_context(|| format!("PLATFORM_TIMEOUT_MS is not a number: {ms}"))?;
            config.platform_timeout = Duration::from_millis(ms);
        }
        if let Some(limit) = lookup("ARTIFACT_UPLOAD_LIMIT_BYTES") {
            config.upload_limit_bytes = limit
                .parse()
                .with_context(|| format!("ARTIFACT_UPLOAD_LIMIT_BYTES is not a number: {limit}"))?;
        }

        Ok(config)
    }

    pub fn with_public_base_url(mut self, base: impl Into<String>) -> Self {
        self.public_base_url = Some(trim_base(base.into()));
        self
    }

    pub fn with_platform_timeout(mut self, timeout: Duration) -> Self {
        self.platform_timeout = timeout;
        self
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.federation_issuer = issuer.into();
        self
    }
}

fn trim_base(base: String) -> String {
    base.trim_end_matches('/').to_string()
}
