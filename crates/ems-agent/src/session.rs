//! Per-session context: credentials, active date range, fetched payloads,
//! and the conversation log.
//!
//! A `Session` is the presentation boundary. A front-end owns one per user
//! and calls `ask`; everything else is state read/write and clearing.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use ems_data_client::{DataFetcher, HttpDataSource, PayloadCache};
use ems_llm::{ChatModel, OpenAiClient};
use ems_protocol::{ConversationEntry, Credentials, DateRange, EndpointKey};

use crate::config::AssistantConfig;
use crate::error::SessionError;
use crate::history::ConversationLog;
use crate::strategy::{QueryContext, QueryStrategy, build_strategy};

/// Days covered by the initial date range, ending today.
const DEFAULT_RANGE_DAYS: u32 = 7;

/// Payloads fetched during this session, keyed by endpoint and range.
///
/// Unlike the shared TTL cache, entries never expire; they are dropped on
/// refresh or when the active range changes.
#[derive(Debug, Default)]
pub struct SessionStore {
    payloads: HashMap<(EndpointKey, DateRange), serde_json::Value>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, endpoint: EndpointKey, range: &DateRange) -> Option<&serde_json::Value> {
        self.payloads.get(&(endpoint, *range))
    }

    pub fn insert(&mut self, endpoint: EndpointKey, range: DateRange, payload: serde_json::Value) {
        self.payloads.insert((endpoint, range), payload);
    }

    /// Endpoints with a stored payload for `range`, in catalog order.
    pub fn endpoints_for(&self, range: &DateRange) -> Vec<EndpointKey> {
        EndpointKey::ALL
            .into_iter()
            .filter(|&e| self.payloads.contains_key(&(e, *range)))
            .collect()
    }

    pub fn clear(&mut self) {
        self.payloads.clear();
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }
}

/// One user's conversation with the assistant.
pub struct Session {
    fetcher: DataFetcher,
    strategy: Box<dyn QueryStrategy>,
    credentials: Option<Credentials>,
    date_range: DateRange,
    store: SessionStore,
    log: ConversationLog,
}

impl Session {
    pub fn new(
        fetcher: DataFetcher,
        strategy: Box<dyn QueryStrategy>,
        date_range: DateRange,
    ) -> Self {
        Self {
            fetcher,
            strategy,
            credentials: None,
            date_range,
            store: SessionStore::new(),
            log: ConversationLog::new(),
        }
    }

    /// Wire the HTTP data source, TTL cache, model client, and configured
    /// strategy. The initial range is the last seven days.
    pub fn from_config(config: &AssistantConfig) -> anyhow::Result<Self> {
        let source = HttpDataSource::new(config.endpoints.catalog(), config.fetch.timeout())?;
        let cache = Arc::new(PayloadCache::with_ttl(config.fetch.cache_ttl()));
        let fetcher = DataFetcher::new(Arc::new(source), cache);
        let model: Arc<dyn ChatModel> = Arc::new(OpenAiClient::new(config.llm.clone())?);
        let strategy = build_strategy(config.strategy, model);
        let range = DateRange::trailing_days(Local::now().date_naive(), DEFAULT_RANGE_DAYS);
        tracing::info!(strategy = strategy.name(), %range, "session created");
        Ok(Self::new(fetcher, strategy, range))
    }

    /// Stored payloads belong to whoever fetched them; they are dropped
    /// when the credentials change.
    pub fn set_credentials(&mut self, credentials: Credentials) {
        if self.credentials.as_ref() != Some(&credentials) {
            self.store.clear();
        }
        tracing::info!("credentials set");
        self.credentials = Some(credentials);
    }

    pub fn clear_credentials(&mut self) {
        self.store.clear();
        self.credentials = None;
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.as_ref().is_some_and(Credentials::is_complete)
    }

    /// Change the active range. Stored payloads are dropped if it differs.
    pub fn set_date_range(&mut self, range: DateRange) {
        if range != self.date_range {
            tracing::info!(from = %self.date_range, to = %range, "date range changed");
            self.store.clear();
            self.date_range = range;
        }
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    /// Payload stored for `endpoint` under the active range.
    pub fn cached_payload(&self, endpoint: EndpointKey) -> Option<&serde_json::Value> {
        self.store.get(endpoint, &self.date_range)
    }

    pub fn cached_endpoints(&self) -> Vec<EndpointKey> {
        self.store.endpoints_for(&self.date_range)
    }

    /// Drop session payloads and invalidate the shared TTL cache.
    pub async fn refresh(&mut self) {
        self.store.clear();
        self.fetcher.invalidate_all().await;
        tracing::info!("session data refreshed");
    }

    pub fn clear_history(&mut self) {
        self.log.clear();
    }

    /// Forget history, payloads and credentials. The range is kept.
    pub fn reset(&mut self) {
        self.log.clear();
        self.store.clear();
        self.credentials = None;
    }

    pub fn history(&self) -> &ConversationLog {
        &self.log
    }

    pub fn strategy_name(&self) -> &str {
        self.strategy.name()
    }

    /// Answer one question and append it to the log.
    ///
    /// Only precondition failures are errors; model and data failures are
    /// recorded as entries with a non-`Answered` status.
    pub async fn ask(&mut self, question: &str) -> Result<&ConversationEntry, SessionError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(SessionError::EmptyQuestion);
        }
        let credentials = self
            .credentials
            .as_ref()
            .filter(|c| c.is_complete())
            .ok_or(SessionError::MissingCredentials)?;

        let started = Instant::now();
        let mut ctx = QueryContext {
            fetcher: &self.fetcher,
            credentials,
            date_range: self.date_range,
            store: &mut self.store,
        };
        let answer = self.strategy.answer(question, &mut ctx).await;

        tracing::info!(
            strategy = self.strategy.name(),
            status = ?answer.status,
            tools = answer.trace.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "question answered"
        );

        let entry = ConversationEntry::new(question, answer.text, answer.status, answer.trace);
        Ok(self.log.push(entry))
    }
}
