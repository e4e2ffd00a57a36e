//! Agent error types.

use ems_data_client::FetchError;
use ems_protocol::RangeError;
use thiserror::Error;

/// Failure of a single tool invocation. Recorded inline in the trace,
/// never propagated out of a question.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid date range: {0}")]
    InvalidRange(#[from] RangeError),

    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Preconditions for asking a question.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("question is empty")]
    EmptyQuestion,

    #[error("API credentials are not configured")]
    MissingCredentials,
}
