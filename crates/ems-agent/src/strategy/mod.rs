//! Intent resolution and grounded answering.
//!
//! Two strategies turn a question into an answer:
//! - **Tool calling**: the model picks any number of data tools, sees
//!   their JSON, and writes the answer.
//! - **Classification**: the model emits one endpoint label at
//!   temperature 0; that payload is then analyzed in a second call.
//!
//! Neither strategy returns an error. Model and fetch failures become
//! visible answer text with a non-`Answered` status.

pub mod classification;
pub mod tool_calling;

use std::sync::Arc;

use async_trait::async_trait;
use ems_data_client::DataFetcher;
use ems_llm::{ChatMessage, ChatModel, LlmError};
use ems_protocol::{AnswerStatus, Credentials, DateRange, ToolInvocation};

use crate::config::StrategyKind;
use crate::session::SessionStore;

pub use classification::{ClassificationStrategy, IntentClassifier};
pub use tool_calling::ToolCallingStrategy;

/// Prefix of the answer text when a model call fails.
pub const MODEL_FAILURE_PREFIX: &str = "[error] model call failed";

/// Shown when the model returns an empty final message.
pub const EMPTY_REPLY: &str = "(sin respuesta del modelo)";

/// Trimmed reply text, or `EMPTY_REPLY` when there is none.
pub(crate) fn reply_text(message: &ChatMessage) -> String {
    match message.text().map(str::trim) {
        Some(text) if !text.is_empty() => text.to_string(),
        _ => EMPTY_REPLY.to_string(),
    }
}

/// Outcome of one question, before it is logged.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub status: AnswerStatus,
    /// Endpoints consulted, in request order.
    pub trace: Vec<ToolInvocation>,
}

impl Answer {
    pub fn answered(text: impl Into<String>, trace: Vec<ToolInvocation>) -> Self {
        Self {
            text: text.into(),
            status: AnswerStatus::Answered,
            trace,
        }
    }

    pub fn model_failed(err: &LlmError, trace: Vec<ToolInvocation>) -> Self {
        Self {
            text: format!("{MODEL_FAILURE_PREFIX}: {err}"),
            status: AnswerStatus::ModelFailed,
            trace,
        }
    }

    pub fn data_error(message: impl Into<String>, trace: Vec<ToolInvocation>) -> Self {
        Self {
            text: message.into(),
            status: AnswerStatus::DataError,
            trace,
        }
    }
}

/// Everything a strategy may touch while answering one question.
pub struct QueryContext<'a> {
    pub fetcher: &'a DataFetcher,
    pub credentials: &'a Credentials,
    /// Range used when the model does not supply one.
    pub date_range: DateRange,
    pub store: &'a mut SessionStore,
}

/// A way of answering questions from endpoint data.
#[async_trait]
pub trait QueryStrategy: Send + Sync {
    async fn answer(&self, question: &str, ctx: &mut QueryContext<'_>) -> Answer;

    /// Strategy name (for logging).
    fn name(&self) -> &str;
}

/// Strategy for the configured kind, backed by `model`.
pub fn build_strategy(kind: StrategyKind, model: Arc<dyn ChatModel>) -> Box<dyn QueryStrategy> {
    match kind {
        StrategyKind::ToolCalling => Box::new(ToolCallingStrategy::new(model)),
        StrategyKind::Classification => Box::new(ClassificationStrategy::new(model)),
    }
}
