//! Tool executor — runs the data tools requested in one model turn.
//!
//! Bridges model tool calls and the data layer: resolves names through the
//! `ToolRegistry`, picks the date range, consults the session store, and
//! fetches whatever is missing concurrently. Failures never escape; they
//! become inline error records in the trace.

use std::collections::HashSet;
use std::time::Instant;

use ems_llm::{FunctionCall, ToolCall};
use ems_protocol::{DateRange, EndpointKey, ToolInvocation, ToolOutcome};
use futures::future::join_all;
use serde_json::json;

use crate::error::ToolError;
use crate::strategy::QueryContext;
use crate::tools::ToolRegistry;

/// What to do for one distinct tool.
enum Step {
    Done(ToolOutcome),
    Fetch { endpoint: EndpointKey, range: DateRange },
}

pub struct ToolExecutor<'a> {
    registry: &'a ToolRegistry,
}

impl<'a> ToolExecutor<'a> {
    pub fn new(registry: &'a ToolRegistry) -> Self {
        Self { registry }
    }

    /// Execute each distinct tool name once, with the arguments of its
    /// first occurrence. The trace has one record per distinct name in
    /// request order.
    pub async fn run(&self, calls: &[ToolCall], ctx: &mut QueryContext<'_>) -> Vec<ToolInvocation> {
        let mut seen = HashSet::new();
        let mut planned = Vec::new();
        for call in calls {
            let name = call.function.name.as_str();
            if !seen.insert(name) {
                tracing::debug!(tool = name, "duplicate tool call, reusing first result");
                continue;
            }
            let arguments = parse_arguments(&call.function);
            let step = self.plan(name, &arguments, ctx);
            planned.push((name, arguments, step));
        }

        let started = Instant::now();
        let fetcher = ctx.fetcher;
        let credentials = ctx.credentials;
        let pending = planned.iter().filter_map(move |(_, _, step)| match step {
            Step::Fetch { endpoint, range } => {
                Some(async move { fetcher.fetch(*endpoint, credentials, Some(range)).await })
            }
            Step::Done(_) => None,
        });
        let mut fetched = join_all(pending).await.into_iter();

        let mut trace = Vec::with_capacity(planned.len());
        for (name, arguments, step) in planned {
            let outcome = match step {
                Step::Done(outcome) => outcome,
                Step::Fetch { endpoint, range } => match fetched.next() {
                    Some(Ok(payload)) => {
                        ctx.store.insert(endpoint, range, payload.clone());
                        ToolOutcome::Payload(payload)
                    }
                    Some(Err(e)) => {
                        tracing::warn!(tool = name, %endpoint, error = %e, "tool fetch failed");
                        ToolOutcome::Error(ToolError::from(e).to_string())
                    }
                    None => ToolOutcome::Error(format!("no result for {name}")),
                },
            };
            trace.push(ToolInvocation::new(name, arguments, outcome));
        }

        tracing::info!(
            tools = trace.len(),
            errors = trace.iter().filter(|t| t.outcome.is_error()).count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "tool calls executed"
        );
        trace
    }

    fn plan(&self, name: &str, arguments: &serde_json::Value, ctx: &QueryContext<'_>) -> Step {
        let Some(endpoint) = self.registry.lookup(name) else {
            tracing::warn!(tool = name, "model requested unknown tool");
            let error = ToolError::UnknownTool(name.to_string());
            return Step::Done(ToolOutcome::Error(error.to_string()));
        };
        let range = match resolve_range(arguments, ctx.date_range) {
            Ok(range) => range,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "rejected tool date range");
                return Step::Done(ToolOutcome::Error(e.to_string()));
            }
        };
        match ctx.store.get(endpoint, &range) {
            Some(payload) => {
                tracing::debug!(%endpoint, %range, "session store hit");
                Step::Done(ToolOutcome::Payload(payload.clone()))
            }
            None => Step::Fetch { endpoint, range },
        }
    }
}

/// Fetch a single endpoint for `range`, preferring the session store.
pub async fn fetch_endpoint(
    endpoint: EndpointKey,
    range: DateRange,
    ctx: &mut QueryContext<'_>,
) -> ToolOutcome {
    if let Some(payload) = ctx.store.get(endpoint, &range) {
        tracing::debug!(%endpoint, %range, "session store hit");
        return ToolOutcome::Payload(payload.clone());
    }
    match ctx.fetcher.fetch(endpoint, ctx.credentials, Some(&range)).await {
        Ok(payload) => {
            ctx.store.insert(endpoint, range, payload.clone());
            ToolOutcome::Payload(payload)
        }
        Err(e) => {
            tracing::warn!(%endpoint, error = %e, "endpoint fetch failed");
            ToolOutcome::Error(ToolError::from(e).to_string())
        }
    }
}

/// `dateStart`/`dateEnd` arguments for a range, as the model would send them.
pub fn range_arguments(range: &DateRange) -> serde_json::Value {
    json!({ "dateStart": range.start_str(), "dateEnd": range.end_str() })
}

/// Parse raw argument text; anything but a JSON object becomes `{}`.
fn parse_arguments(call: &FunctionCall) -> serde_json::Value {
    if call.arguments.trim().is_empty() {
        return json!({});
    }
    match serde_json::from_str::<serde_json::Value>(&call.arguments) {
        Ok(value) if value.is_object() => value,
        Ok(_) | Err(_) => {
            tracing::warn!(
                tool = %call.name,
                raw = %call.arguments,
                "malformed tool arguments, using {{}}"
            );
            json!({})
        }
    }
}

/// Range from the arguments when both dates are given, else `fallback`.
fn resolve_range(
    arguments: &serde_json::Value,
    fallback: DateRange,
) -> Result<DateRange, ToolError> {
    match (arguments.get("dateStart"), arguments.get("dateEnd")) {
        (Some(start), Some(end)) => {
            let start = as_date_str(start)?;
            let end = as_date_str(end)?;
            Ok(DateRange::parse(start, end)?)
        }
        _ => Ok(fallback),
    }
}

fn as_date_str(value: &serde_json::Value) -> Result<&str, ToolError> {
    value.as_str().ok_or_else(|| {
        ToolError::InvalidRange(ems_protocol::RangeError::InvalidDate(value.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use ems_data_client::{DataFetcher, FetchError, MockDataSource, PayloadCache};
    use ems_protocol::Credentials;
    use std::sync::Arc;

    struct Harness {
        mock: Arc<MockDataSource>,
        fetcher: DataFetcher,
        credentials: Credentials,
        store: SessionStore,
    }

    impl Harness {
        fn new() -> Self {
            let mock = Arc::new(MockDataSource::with_sample_data());
            let fetcher = DataFetcher::new(mock.clone(), Arc::new(PayloadCache::new()));
            Self {
                mock,
                fetcher,
                credentials: Credentials::new("ingeniero", "secreto"),
                store: SessionStore::new(),
            }
        }

        fn ctx(&mut self) -> QueryContext<'_> {
            QueryContext {
                fetcher: &self.fetcher,
                credentials: &self.credentials,
                date_range: week(),
                store: &mut self.store,
            }
        }
    }

    fn week() -> DateRange {
        DateRange::parse("2024-05-13", "2024-05-19").unwrap()
    }

    fn call(id: &str, name: &str, args: &str) -> ToolCall {
        ToolCall::new(id, name, args)
    }

    #[tokio::test]
    async fn runs_tools_in_request_order() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        let calls = [
            call("c1", "obtener_linea_base", "{}"),
            call("c2", "obtener_datos_moldes", "{}"),
        ];
        let trace = ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;

        let names: Vec<_> = trace.iter().map(|t| t.tool_name.as_str()).collect();
        assert_eq!(names, ["obtener_linea_base", "obtener_datos_moldes"]);
        assert!(trace.iter().all(|t| !t.outcome.is_error()));
        assert_eq!(h.mock.call_count(), 2);
        assert_eq!(h.store.len(), 2);
    }

    #[tokio::test]
    async fn duplicates_run_once_with_first_arguments() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        let calls = [
            call(
                "c1",
                "obtener_datos_moldes",
                r#"{"dateStart":"2024-05-01","dateEnd":"2024-05-07"}"#,
            ),
            call(
                "c2",
                "obtener_datos_moldes",
                r#"{"dateStart":"2024-06-01","dateEnd":"2024-06-07"}"#,
            ),
        ];
        let trace = ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;

        assert_eq!(trace.len(), 1);
        assert_eq!(trace[0].arguments["dateStart"], "2024-05-01");
        let calls = h.mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].range, Some(DateRange::parse("2024-05-01", "2024-05-07").unwrap()));
    }

    #[tokio::test]
    async fn missing_arguments_use_session_range() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        let calls = [call("c1", "obtener_resumen_general", "")];
        ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;
        assert_eq!(h.mock.calls()[0].range, Some(week()));
    }

    #[tokio::test]
    async fn malformed_arguments_become_empty_object() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        let calls = [
            call("c1", "obtener_datos_referencias", "{not json"),
            call("c2", "obtener_linea_base", "[1, 2]"),
        ];
        let trace = ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;
        assert!(trace.iter().all(|t| t.arguments == json!({})));
        assert!(trace.iter().all(|t| !t.outcome.is_error()));
    }

    #[tokio::test]
    async fn unknown_tool_is_inline_error() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        let calls = [
            call("c1", "borrar_todo", "{}"),
            call("c2", "obtener_datos_moldes", "{}"),
        ];
        let trace = ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;
        assert_eq!(trace.len(), 2);
        assert_eq!(trace[0].outcome, ToolOutcome::Error("unknown tool: borrar_todo".into()));
        assert!(!trace[1].outcome.is_error());
        assert_eq!(h.mock.call_count(), 1);
    }

    #[tokio::test]
    async fn inverted_range_rejected_before_fetch() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        let calls = [call(
            "c1",
            "obtener_datos_moldes",
            r#"{"dateStart":"2024-05-19","dateEnd":"2024-05-13"}"#,
        )];
        let trace = ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;
        assert!(trace[0].outcome.is_error());
        assert_eq!(h.mock.call_count(), 0);
    }

    #[tokio::test]
    async fn non_string_date_rejected() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        let calls = [call(
            "c1",
            "obtener_datos_moldes",
            r#"{"dateStart":20240513,"dateEnd":"2024-05-19"}"#,
        )];
        let trace = ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;
        assert!(trace[0].outcome.is_error());
        assert_eq!(h.mock.call_count(), 0);
    }

    #[tokio::test]
    async fn fetch_failure_does_not_affect_siblings() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        h.mock.set_error(
            EndpointKey::LineaBase,
            FetchError::http_status(500, "Internal Server Error"),
        );
        let calls = [
            call("c1", "obtener_datos_moldes", "{}"),
            call("c2", "obtener_linea_base", "{}"),
        ];
        let trace = ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;

        assert!(!trace[0].outcome.is_error());
        match &trace[1].outcome {
            ToolOutcome::Error(msg) => assert!(msg.contains("500"), "{msg}"),
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(h.store.len(), 1);
    }

    #[tokio::test]
    async fn session_store_hit_skips_fetch() {
        let registry = ToolRegistry::with_defaults();
        let mut h = Harness::new();
        h.store.insert(EndpointKey::Moldes, week(), json!({"cached": true}));
        let calls = [call("c1", "obtener_datos_moldes", "{}")];
        let trace = ToolExecutor::new(&registry).run(&calls, &mut h.ctx()).await;

        assert_eq!(trace[0].outcome, ToolOutcome::Payload(json!({"cached": true})));
        assert_eq!(h.mock.call_count(), 0);
    }

    #[tokio::test]
    async fn fetch_endpoint_populates_store() {
        let mut h = Harness::new();
        let outcome = fetch_endpoint(EndpointKey::Summary, week(), &mut h.ctx()).await;
        assert!(!outcome.is_error());
        assert!(h.store.get(EndpointKey::Summary, &week()).is_some());

        fetch_endpoint(EndpointKey::Summary, week(), &mut h.ctx()).await;
        assert_eq!(h.mock.call_count(), 1);
    }

    #[test]
    fn range_arguments_shape() {
        assert_eq!(
            range_arguments(&week()),
            json!({"dateStart": "2024-05-13", "dateEnd": "2024-05-19"})
        );
    }
}
