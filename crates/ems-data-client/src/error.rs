//! Fetch error types.

use thiserror::Error;

/// Longest response body excerpt kept in `HttpStatus` errors, in characters.
pub const BODY_EXCERPT_CHARS: usize = 200;

/// Errors that can occur while fetching an endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request to {endpoint} timed out after {secs}s")]
    Timeout { endpoint: String, secs: u64 },

    #[error("connection to {endpoint} failed: {message}")]
    Connection { endpoint: String, message: String },

    #[error("HTTP {code}: {body_excerpt}")]
    HttpStatus { code: u16, body_excerpt: String },

    #[error("invalid JSON in response: {0}")]
    JsonDecode(String),

    #[error("request failed: {0}")]
    Request(String),
}

impl FetchError {
    /// Build an `HttpStatus` error, truncating the body to the excerpt limit.
    pub fn http_status(code: u16, body: &str) -> Self {
        Self::HttpStatus {
            code,
            body_excerpt: excerpt(body),
        }
    }
}

/// First `BODY_EXCERPT_CHARS` characters of `body` (char-boundary safe).
pub fn excerpt(body: &str) -> String {
    body.chars().take(BODY_EXCERPT_CHARS).collect()
}

/// Convenience alias for fetch results.
pub type FetchResult<T> = Result<T, FetchError>;
