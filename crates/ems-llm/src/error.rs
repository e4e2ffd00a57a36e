//! Language-model call errors.

use thiserror::Error;

/// Errors from a model call. Any of these is a model-call failure to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("model request failed: {0}")]
    Request(String),

    #[error("model request timed out after {0}s")]
    Timeout(u64),

    #[error("model API returned HTTP {code}: {body_excerpt}")]
    Status { code: u16, body_excerpt: String },

    #[error("invalid model response: {0}")]
    Decode(String),

    #[error("model response had no choices")]
    EmptyResponse,
}

/// Convenience alias.
pub type LlmResult<T> = Result<T, LlmError>;
