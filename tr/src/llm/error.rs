//! LLM error types

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a model call
///
/// None of these are retried; they end the current query.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("LLM API key not found. Set the {env} environment variable.")]
    MissingApiKey { env: String },

    #[error("Unknown LLM provider: '{0}'. Supported: anthropic")]
    UnknownProvider(String),
}
