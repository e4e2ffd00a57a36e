//! Scripted model for tests — replays queued turns and records requests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::ChatModel;
use crate::error::{LlmError, LlmResult};
use crate::types::{ChatMessage, CompletionRequest, ToolCall};

/// Deterministic `ChatModel` that returns queued results in order.
///
/// Once the script is exhausted every call fails with `LlmError::Request`.
#[derive(Default)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<LlmResult<ChatMessage>>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a plain text answer.
    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(ChatMessage::assistant(text)))
    }

    /// Queue a tool-call turn. Each tuple is `(call_id, tool_name, raw_arguments)`.
    pub fn then_tool_calls(self, calls: &[(&str, &str, &str)]) -> Self {
        let calls = calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, *args))
            .collect();
        self.push(Ok(ChatMessage::assistant_tool_calls(calls)))
    }

    /// Queue a failed call.
    pub fn then_error(self, err: LlmError) -> Self {
        self.push(Err(err))
    }

    fn push(self, item: LlmResult<ChatMessage>) -> Self {
        self.script.lock().unwrap().push_back(item);
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<ChatMessage> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Request("scripted model exhausted".into())))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
