//! Data source abstraction — fetch endpoint JSON over HTTP or from mocks.

use std::time::Duration;

use async_trait::async_trait;
use ems_protocol::{Credentials, DateRange, EndpointCatalog, EndpointKey};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};

use crate::error::{FetchError, FetchResult};

/// Fixed per-request timeout for the energy API.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CLIENT_USER_AGENT: &str = concat!("ems-agent/", env!("CARGO_PKG_VERSION"));

/// Abstraction over where endpoint payloads come from.
///
/// Enables mocking for tests; `HttpDataSource` is the production backend.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Fetch one endpoint's JSON for an optional date range.
    async fn fetch(
        &self,
        endpoint: EndpointKey,
        credentials: &Credentials,
        range: Option<&DateRange>,
    ) -> FetchResult<serde_json::Value>;
}

/// Issues authenticated GET requests against the endpoint catalog.
///
/// Never retries: a failed request is reported as-is.
pub struct HttpDataSource {
    client: reqwest::Client,
    catalog: EndpointCatalog,
    timeout: Duration,
}

impl HttpDataSource {
    pub fn new(catalog: EndpointCatalog, timeout: Duration) -> FetchResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            catalog,
            timeout,
        })
    }

    pub fn catalog(&self) -> &EndpointCatalog {
        &self.catalog
    }

    fn classify(&self, endpoint: EndpointKey, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout {
                endpoint: endpoint.to_string(),
                secs: self.timeout.as_secs(),
            }
        } else if err.is_connect() {
            FetchError::Connection {
                endpoint: endpoint.to_string(),
                message: err.to_string(),
            }
        } else {
            FetchError::Request(err.to_string())
        }
    }
}

#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch(
        &self,
        endpoint: EndpointKey,
        credentials: &Credentials,
        range: Option<&DateRange>,
    ) -> FetchResult<serde_json::Value> {
        let descriptor = self.catalog.get(endpoint);

        let mut request = self
            .client
            .get(&descriptor.url)
            .header(AUTHORIZATION, credentials.basic_auth_header())
            .header(ACCEPT, "application/json")
            .header(USER_AGENT, CLIENT_USER_AGENT);
        if let Some(range) = range {
            request =
                request.query(&[("dateStart", range.start_str()), ("dateEnd", range.end_str())]);
        }

        let started = std::time::Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| self.classify(endpoint, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.classify(endpoint, e))?;

        tracing::debug!(
            endpoint = %endpoint,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "energy api responded"
        );

        if status != StatusCode::OK {
            tracing::warn!(
                endpoint = %endpoint,
                status = status.as_u16(),
                "energy api returned non-200"
            );
            return Err(FetchError::http_status(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| FetchError::JsonDecode(e.to_string()))
    }
}
