//! Classify-then-analyze strategy.
//!
//! A temperature-0 call maps the question to exactly one endpoint label;
//! that endpoint's JSON is fetched and handed to a second call together
//! with the analyst instructions.

use std::sync::Arc;

use async_trait::async_trait;
use ems_llm::{ChatMessage, ChatModel, CompletionRequest, LlmResult};
use ems_protocol::{EndpointKey, ToolInvocation, ToolOutcome};

use super::{Answer, QueryContext, QueryStrategy, reply_text};
use crate::executor::{fetch_endpoint, range_arguments};
use crate::prompts::{ANALYST_PROMPT, ROUTER_PROMPT, analysis_request};

const ANALYSIS_TEMPERATURE: f64 = 0.1;

/// Forced single-label router over the four endpoints.
pub struct IntentClassifier {
    model: Arc<dyn ChatModel>,
}

impl IntentClassifier {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// One endpoint for the question. Only a failed model call is an error;
    /// unrecognized replies fall back to `Summary`.
    pub async fn classify(&self, question: &str) -> LlmResult<EndpointKey> {
        let request = CompletionRequest::new(
            vec![ChatMessage::system(ROUTER_PROMPT), ChatMessage::user(question)],
            0.0,
        );
        let reply = self.model.complete(&request).await?;
        let endpoint = parse_label(reply.text().unwrap_or_default());
        tracing::info!(%endpoint, "question classified");
        Ok(endpoint)
    }
}

/// Trimmed, lower-cased exact label match; anything else is `Summary`.
pub fn parse_label(reply: &str) -> EndpointKey {
    let label = reply.trim().to_lowercase();
    EndpointKey::from_label(&label).unwrap_or_else(|| {
        tracing::warn!(reply = %label, "unrecognized intent label, defaulting to summary");
        EndpointKey::Summary
    })
}

pub struct ClassificationStrategy {
    classifier: IntentClassifier,
    model: Arc<dyn ChatModel>,
}

impl ClassificationStrategy {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self {
            classifier: IntentClassifier::new(model.clone()),
            model,
        }
    }
}

#[async_trait]
impl QueryStrategy for ClassificationStrategy {
    async fn answer(&self, question: &str, ctx: &mut QueryContext<'_>) -> Answer {
        let endpoint = match self.classifier.classify(question).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(
                    model = self.model.model_name(),
                    error = %e,
                    "classification call failed"
                );
                return Answer::model_failed(&e, Vec::new());
            }
        };

        let range = ctx.date_range;
        let outcome = fetch_endpoint(endpoint, range, ctx).await;
        let invocation =
            ToolInvocation::new(endpoint.tool_name(), range_arguments(&range), outcome);

        let payload = match &invocation.outcome {
            ToolOutcome::Payload(payload) => payload.clone(),
            ToolOutcome::Error(message) => {
                let message = message.clone();
                return Answer::data_error(message, vec![invocation]);
            }
        };

        let request = CompletionRequest::new(
            vec![
                ChatMessage::system(ANALYST_PROMPT),
                ChatMessage::user(analysis_request(question, endpoint, &payload)),
            ],
            ANALYSIS_TEMPERATURE,
        );
        match self.model.complete(&request).await {
            Ok(message) => Answer::answered(reply_text(&message), vec![invocation]),
            Err(e) => {
                tracing::warn!(model = self.model.model_name(), error = %e, "analysis call failed");
                Answer::model_failed(&e, vec![invocation])
            }
        }
    }

    fn name(&self) -> &str {
        "classification"
    }
}
