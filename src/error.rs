//! Crate-wide typed error hierarchy.
//!
//! Every component (cache, store, identity, limiter, router, invoker, adapters,
//! pipeline) returns [`GatewayError`]. The pipeline is the single place that
//! translates a `GatewayError` into an HTTP status and the wire error code
//! taxonomy, keeping that mapping in one spot rather than duplicated per handler.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("authentication failed: {0}")]
    Authentication(&'static str),

    #[error("authorization denied: {0}")]
    Authorization(&'static str),

    #[error("not subscribed: {0}")]
    NotSubscribed(&'static str),

    #[error("ip policy denied: {0}")]
    IpDenied(&'static str),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not found: {0}")]
    NotFound(&'static str),

    #[error("rate limited")]
    RateLimited,

    #[error("throttled")]
    Throttled,

    #[error("bandwidth limit exceeded")]
    BandwidthExceeded,

    #[error("credits exhausted")]
    CreditsExhausted,

    #[error("circuit open for {0}")]
    CircuitOpen(String),

    #[error("upstream error: status {0}")]
    UpstreamStatus(u16),

    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// HTTP status code per §7 of the error taxonomy.
    pub fn status_code(&self) -> u16 {
        use GatewayError::*;
        match self {
            Authentication(_) => 401,
            Authorization(_) | NotSubscribed(_) | IpDenied(_) => 403,
            Validation(_) | InvalidRequest(_) => 400,
            NotFound(_) => 404,
            RateLimited | Throttled | BandwidthExceeded => 429,
            CreditsExhausted => 402,
            CircuitOpen(_) => 503,
            UpstreamStatus(_) | UpstreamUnreachable(_) => 502,
            Store(_) | Cache(_) | Serialization(_) | Encryption(_) | Configuration(_)
            | Internal(_) => 500,
        }
    }

    /// Machine-readable error code embedded in the response envelope (§6, §7).
    pub fn error_code(&self) -> &'static str {
        use GatewayError::*;
        match self {
            Authentication(_) => "AUTHN001",
            Authorization(_) => "API007",
            NotSubscribed(_) => "SUB003",
            IpDenied(_) => "SEC010",
            Validation(_) | InvalidRequest(_) => "GTW011",
            NotFound(_) => "API001",
            RateLimited => "GTW429",
            Throttled => "GTW430",
            BandwidthExceeded => "GTW431",
            CreditsExhausted => "GTW402",
            CircuitOpen(_) => "GTW503",
            UpstreamStatus(_) => "GTW502",
            UpstreamUnreachable(_) => "GTW502",
            Store(_) | Cache(_) | Serialization(_) | Encryption(_) | Configuration(_)
            | Internal(_) => "GTW999",
        }
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;

impl From<serde_json::Error> for GatewayError {
    fn from(e: serde_json::Error) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

impl From<bincode::error::EncodeError> for GatewayError {
    fn from(e: bincode::error::EncodeError) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for GatewayError {
    fn from(e: bincode::error::DecodeError) -> Self {
        GatewayError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::UpstreamUnreachable(e.to_string())
    }
}
