//! Shared test harness for E2E tests.
//!
//! Starts one mock server for the energy data API and one for the
//! OpenAI-compatible model API, and wires a real `Session` against both.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use ems_agent::Session;
use ems_agent::config::{AssistantConfig, EndpointsConfig, StrategyKind};
use ems_agent::strategy::build_strategy;
use ems_data_client::{DataFetcher, HttpDataSource, PayloadCache};
use ems_llm::{ChatModel, OpenAiClient, OpenAiConfig};
use ems_protocol::{Credentials, DateRange};

/// Data API + model API mocks and a session pointed at them.
pub struct TestHarness {
    pub data: MockServer,
    pub llm: MockServer,
    pub session: Session,
}

impl TestHarness {
    /// Session built through `Session::from_config`, with credentials and
    /// the test week already set.
    pub async fn start(strategy: StrategyKind) -> Self {
        let data = MockServer::start().await;
        let llm = MockServer::start().await;
        let mut session = Session::from_config(&config(&data, &llm, strategy)).unwrap();
        session.set_credentials(credentials());
        session.set_date_range(week());
        Self { data, llm, session }
    }

    /// Number of requests the data API received for one path.
    pub async fn data_hits(&self, endpoint_path: &str) -> usize {
        self.data
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == endpoint_path)
            .count()
    }

    /// Model request bodies, in order.
    pub async fn llm_bodies(&self) -> Vec<Value> {
        self.llm
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect()
    }
}

pub fn config(data: &MockServer, llm: &MockServer, strategy: StrategyKind) -> AssistantConfig {
    let mut config = AssistantConfig {
        strategy,
        endpoints: EndpointsConfig::with_base_url(&data.uri()),
        ..AssistantConfig::default()
    };
    config.fetch.timeout_secs = 5;
    config.llm.base_url = llm.uri();
    config.llm.timeout_secs = 5;
    config.llm.api_key = Some("sk-test".into());
    config
}

/// A fetcher over `data` with its own TTL cache, for sharing across sessions.
pub fn shared_fetcher(data: &MockServer) -> DataFetcher {
    let catalog = EndpointsConfig::with_base_url(&data.uri()).catalog();
    let source = HttpDataSource::new(catalog, Duration::from_secs(5)).unwrap();
    DataFetcher::new(Arc::new(source), Arc::new(PayloadCache::new()))
}

/// Session over an existing fetcher, credentials and test week set.
pub fn session_over(fetcher: DataFetcher, llm: &MockServer, strategy: StrategyKind) -> Session {
    let model: Arc<dyn ChatModel> = Arc::new(
        OpenAiClient::new(OpenAiConfig {
            base_url: llm.uri(),
            model: "gpt-4-turbo".into(),
            timeout_secs: 5,
            api_key: Some("sk-test".into()),
        })
        .unwrap(),
    );
    let mut session = Session::new(fetcher, build_strategy(strategy, model), week());
    session.set_credentials(credentials());
    session
}

pub fn credentials() -> Credentials {
    Credentials::new("ingeniero", "secreto")
}

pub fn week() -> DateRange {
    DateRange::parse("2024-05-13", "2024-05-19").unwrap()
}

pub fn molds_payload() -> Value {
    json!([
        {"molde": "A", "SECn": 1.2, "consumo_kWh": 1250.0, "produccion_kg": 1040.0},
        {"molde": "B", "SECn": 3.4, "consumo_kWh": 2890.0, "produccion_kg": 850.0}
    ])
}

pub fn baseline_payload() -> Value {
    json!({
        "modelo": {"pendiente": 0.82, "intercepto": 145.3},
        "cusum": [{"semana": "2024-W20", "energia_kWh": -120.5, "costo": -61.4}]
    })
}

/// Serve `body` with status 200 on `GET endpoint_path`.
pub async fn mount_payload(server: &MockServer, endpoint_path: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint_path))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Chat completion envelope around one assistant message.
pub fn completion(message: Value) -> Value {
    json!({
        "id": "chatcmpl-e2e",
        "object": "chat.completion",
        "model": "gpt-4-turbo",
        "choices": [{"index": 0, "message": message, "finish_reason": "stop"}]
    })
}

pub fn text_reply(text: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(completion(json!({
        "role": "assistant",
        "content": text
    })))
}

/// Assistant turn requesting tools. Each tuple is `(id, name, arguments)`.
pub fn tool_call_reply(calls: &[(&str, &str, &str)]) -> ResponseTemplate {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| {
            json!({"id": id, "type": "function", "function": {"name": name, "arguments": args}})
        })
        .collect();
    ResponseTemplate::new(200).set_body_json(completion(json!({
        "role": "assistant",
        "content": null,
        "tool_calls": tool_calls
    })))
}

/// True when the request body offers tools (first tool-calling round).
pub fn offers_tools(req: &Request) -> bool {
    serde_json::from_slice::<Value>(&req.body)
        .map(|b| b.get("tools").is_some())
        .unwrap_or(false)
}

/// True when the system message is the router prompt.
pub fn is_router_call(req: &Request) -> bool {
    serde_json::from_slice::<Value>(&req.body)
        .map(|b| b["messages"][0]["content"] == ems_agent::prompts::ROUTER_PROMPT)
        .unwrap_or(false)
}
