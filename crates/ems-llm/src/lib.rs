//! Language-model access for the energy agent.
//!
//! `ChatModel` is the seam: `OpenAiClient` talks to any OpenAI-compatible
//! `/chat/completions` endpoint, `ScriptedModel` replays canned turns in
//! tests.

pub mod client;
pub mod error;
pub mod mock;
pub mod types;

use async_trait::async_trait;

pub use client::{OpenAiClient, OpenAiConfig};
pub use error::{LlmError, LlmResult};
pub use mock::ScriptedModel;
pub use types::{
    ChatMessage, CompletionRequest, FunctionCall, FunctionSpec, Role, ToolCall, ToolDeclaration,
};

/// A chat-completion capable language model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Run one completion and return the assistant message.
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<ChatMessage>;

    /// Model identifier (for logging).
    fn model_name(&self) -> &str;
}
