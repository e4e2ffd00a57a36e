//! Mock data source for testing — serves pre-loaded payloads per endpoint.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use ems_protocol::{Credentials, DateRange, EndpointKey};
use serde_json::json;

use crate::error::{FetchError, FetchResult};
use crate::source::DataSource;

/// A recorded call against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub endpoint: EndpointKey,
    pub range: Option<DateRange>,
    pub username: String,
}

/// In-memory `DataSource` that records every call.
///
/// Endpoints without a payload or scripted error answer with HTTP 404.
#[derive(Default)]
pub struct MockDataSource {
    payloads: Mutex<HashMap<EndpointKey, serde_json::Value>>,
    errors: Mutex<HashMap<EndpointKey, FetchError>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style payload registration.
    pub fn with_payload(self, endpoint: EndpointKey, payload: serde_json::Value) -> Self {
        self.set_payload(endpoint, payload);
        self
    }

    /// Plausible payloads for all four endpoints.
    pub fn with_sample_data() -> Self {
        Self::new()
            .with_payload(
                EndpointKey::Summary,
                json!([{
                    "id": "OP-1001",
                    "cceId": "INY-03",
                    "pdnTotalTime": 22.5,
                    "pdnEffectiveTime": 20.1,
                    "totalStopTime": 2.4,
                    "stopTimePercentage": 10.7,
                    "totalProduction": 1840.0,
                    "noComplaintProduction": 1795.0,
                    "secN": 1.42,
                    "secG": 1.51
                }]),
            )
            .with_payload(
                EndpointKey::Moldes,
                json!([
                    {"molde": "A", "SECn": 1.2, "consumo_kWh": 5400.0},
                    {"molde": "B", "SECn": 3.4, "consumo_kWh": 8100.0}
                ]),
            )
            .with_payload(
                EndpointKey::Referencias,
                json!([
                    {"referencia": "SKU-77", "SECn": 0.98, "produccion_kg": 1200.0}
                ]),
            )
            .with_payload(
                EndpointKey::LineaBase,
                json!({
                    "pendiente": 0.82,
                    "intercepto": 1250.0,
                    "cusum": [{"semana": "2024-W20", "kWh": -340.0, "costo": -85.5}]
                }),
            )
    }

    pub fn set_payload(&self, endpoint: EndpointKey, payload: serde_json::Value) {
        self.errors.lock().unwrap().remove(&endpoint);
        self.payloads.lock().unwrap().insert(endpoint, payload);
    }

    /// Make every fetch of `endpoint` fail with `error`.
    pub fn set_error(&self, endpoint: EndpointKey, error: FetchError) {
        self.errors.lock().unwrap().insert(endpoint, error);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_count_for(&self, endpoint: EndpointKey) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }
}

#[async_trait]
impl DataSource for MockDataSource {
    async fn fetch(
        &self,
        endpoint: EndpointKey,
        credentials: &Credentials,
        range: Option<&DateRange>,
    ) -> FetchResult<serde_json::Value> {
        self.calls.lock().unwrap().push(MockCall {
            endpoint,
            range: range.copied(),
            username: credentials.username().to_string(),
        });

        if let Some(err) = self.errors.lock().unwrap().get(&endpoint) {
            return Err(err.clone());
        }
        self.payloads
            .lock()
            .unwrap()
            .get(&endpoint)
            .cloned()
            .ok_or_else(|| FetchError::http_status(404, &format!("no mock payload for {endpoint}")))
    }
}
