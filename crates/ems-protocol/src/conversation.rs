use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::trace::ToolInvocation;

/// How a question's pipeline ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// The model produced an answer.
    Answered,
    /// The only data source consulted failed; the answer is the fetch error.
    DataError,
    /// A model call failed; the answer is a marked failure message.
    ModelFailed,
}

/// A completed question/answer exchange. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEntry {
    id: Uuid,
    asked_at: DateTime<Utc>,
    question: String,
    answer: String,
    status: AnswerStatus,
    trace: Vec<ToolInvocation>,
}

impl ConversationEntry {
    pub fn new(
        question: impl Into<String>,
        answer: impl Into<String>,
        status: AnswerStatus,
        trace: Vec<ToolInvocation>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            asked_at: Utc::now(),
            question: question.into(),
            answer: answer.into(),
            status,
            trace,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn asked_at(&self) -> DateTime<Utc> {
        self.asked_at
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn status(&self) -> AnswerStatus {
        self.status
    }

    pub fn trace(&self) -> &[ToolInvocation] {
        &self.trace
    }
}
