use thiserror::Error;

/// Failure taxonomy for the federation layer.
///
/// Only `AuthenticationRejected` is ever surfaced to an external caller as-is.
/// Everything else is recovered close to where it happens (default to app
/// residency, empty result) and logged.
#[derive(Debug, Error)]
pub enum FederationError {
    #[error("configuration unavailable: {0}")]
    ConfigurationUnavailable(String),

    #[error("platform unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("authentication rejected: {0}")]
    AuthenticationRejected(#[from] AuthRejection),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("transformation anomaly: {0}")]
    TransformationAnomaly(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("store: {0}")]
    Store(#[from] StoreError),

    #[error("internal: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FederationError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ConfigurationUnavailable(_) => 503,
            Self::RemoteUnavailable(_) => 502,
            Self::AuthenticationRejected(_) => 401,
            Self::NotFound(_) => 404,
            Self::TransformationAnomaly(_) => 422,
            Self::InvalidInput(_) => 400,
            Self::Store(StoreError::TooLarge { .. }) => 413,
            Self::Store(_) => 500,
            Self::Internal(_) => 500,
        }
    }
}

/// Why an inbound federated request was refused.
///
/// Each variant maps to a stable `reason()` code so the caller can tell a
/// clock problem from a misconfigured audience without parsing prose.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("missing platform request header")]
    MissingPlatformHeader,

    #[error("missing bearer token")]
    MissingBearer,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("missing required claim `{0}`")]
    MissingClaim(&'static str),

    #[error("token expired")]
    Expired,

    #[error("invalid issuer")]
    InvalidIssuer,

    #[error("invalid token type")]
    InvalidType,

    #[error("invalid audience")]
    InvalidAudience,
}

impl AuthRejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MissingPlatformHeader => "missing_platform_header",
            Self::MissingBearer => "missing_bearer",
            Self::InvalidToken(_) => "invalid_token",
            Self::MissingClaim(_) => "missing_claim",
            Self::Expired => "token_expired",
            Self::InvalidIssuer => "invalid_issuer",
            Self::InvalidType => "invalid_type",
            Self::InvalidAudience => "invalid_audience",
        }
    }
}

/// Errors raised by the local document and blob stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid handle: {0}")]
    InvalidHandle(String),

    #[error("artifact {handle} exceeds {limit} bytes")]
    TooLarge { handle: String, limit: usize },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}
