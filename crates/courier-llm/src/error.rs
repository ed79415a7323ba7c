//! Provider error types for courier-llm.

use courier_types::CourierError;
use thiserror::Error;

/// Errors that can occur when calling the reasoning engine.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The HTTP request failed or returned an unexpected status.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Authentication was rejected (HTTP 401/403).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The provider returned HTTP 429.
    #[error("rate limited: retry after {retry_after_ms}ms")]
    RateLimited {
        /// Suggested wait before retrying, in milliseconds.
        retry_after_ms: u64,
    },

    /// The requested model does not exist on the provider.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Missing API key or endpoint.
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// The body could not be decoded into a chat completion.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("timeout")]
    Timeout,

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProviderError>;

impl From<ProviderError> for CourierError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotConfigured(reason) => CourierError::ConfigInvalid { reason },
            other => CourierError::Provider {
                message: other.to_string(),
            },
        }
    }
}
