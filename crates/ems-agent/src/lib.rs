//! Energy-management conversational agent — library crate.
//!
//! Routes plant-engineering questions to the right energy API endpoints,
//! grounds the model's answer in the fetched JSON, and keeps per-session
//! state (credentials, date range, payloads, conversation log).

pub mod config;
pub mod error;
pub mod executor;
pub mod history;
pub mod prompts;
pub mod session;
pub mod strategy;
pub mod telemetry;
pub mod tools;

pub use config::{AssistantConfig, StrategyKind};
pub use error::{SessionError, ToolError};
pub use history::ConversationLog;
pub use session::{Session, SessionStore};
pub use strategy::{Answer, QueryContext, QueryStrategy};
