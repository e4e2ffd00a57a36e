//! Tool-calling strategy — the model chooses which data tools to consult.
//!
//! Round one offers the four tools with `tool_choice: auto`. If the model
//! requests tools, their JSON is fed back as `tool` messages and round two
//! (no tools) produces the grounded answer.

use std::sync::Arc;

use async_trait::async_trait;
use ems_llm::{ChatMessage, ChatModel, CompletionRequest};
use ems_protocol::ToolInvocation;

use super::{Answer, QueryContext, QueryStrategy, reply_text};
use crate::executor::ToolExecutor;
use crate::prompts::{SYSTEM_PROMPT, date_context};
use crate::tools::ToolRegistry;

const TEMPERATURE: f64 = 0.1;

pub struct ToolCallingStrategy {
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
}

impl ToolCallingStrategy {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            model,
            registry: ToolRegistry::with_defaults(),
        }
    }
}

#[async_trait]
impl QueryStrategy for ToolCallingStrategy {
    async fn answer(&self, question: &str, ctx: &mut QueryContext<'_>) -> Answer {
        let mut messages = vec![
            ChatMessage::system(format!("{SYSTEM_PROMPT}\n\n{}", date_context(&ctx.date_range))),
            ChatMessage::user(question),
        ];
        let request = CompletionRequest::new(messages.clone(), TEMPERATURE)
            .with_tools(self.registry.declarations());

        let first = match self.model.complete(&request).await {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!(
                    model = self.model.model_name(),
                    error = %e,
                    "tool selection call failed"
                );
                return Answer::model_failed(&e, Vec::new());
            }
        };

        let calls = first.tool_calls().to_vec();
        if calls.is_empty() {
            tracing::info!(strategy = self.name(), "model answered without tools");
            return Answer::answered(reply_text(&first), Vec::new());
        }
        tracing::info!(
            strategy = self.name(),
            requested = calls.len(),
            tools = ?calls.iter().map(|c| c.function.name.as_str()).collect::<Vec<_>>(),
            "model requested tools"
        );

        let trace = ToolExecutor::new(&self.registry).run(&calls, ctx).await;

        messages.push(first);
        for call in &calls {
            let content = result_for(&trace, &call.function.name);
            messages.push(ChatMessage::tool_result(&call.id, &call.function.name, content));
        }

        match self.model.complete(&CompletionRequest::new(messages, TEMPERATURE)).await {
            Ok(message) => Answer::answered(reply_text(&message), trace),
            Err(e) => {
                tracing::warn!(model = self.model.model_name(), error = %e, "answer call failed");
                Answer::model_failed(&e, trace)
            }
        }
    }

    fn name(&self) -> &str {
        "tool_calling"
    }
}

/// Tool message content for a call; duplicates share their first result.
fn result_for(trace: &[ToolInvocation], tool_name: &str) -> String {
    trace
        .iter()
        .find(|t| t.tool_name == tool_name)
        .map(|t| t.outcome.to_model_content())
        .unwrap_or_else(|| serde_json::json!({ "error": format!("no result for {tool_name}") }))
        .to_string()
}
