//! Cached, authenticated endpoint fetcher.

use std::sync::Arc;

use ems_protocol::{Credentials, DateRange, EndpointKey};

use crate::cache::{CacheKey, PayloadCache};
use crate::error::FetchResult;
use crate::source::DataSource;

/// Composes a `DataSource` with a shared `PayloadCache`.
///
/// Cache hits return without touching the source; failures are returned
/// unchanged and never retried.
#[derive(Clone)]
pub struct DataFetcher {
    source: Arc<dyn DataSource>,
    cache: Arc<PayloadCache>,
}

impl DataFetcher {
    pub fn new(source: Arc<dyn DataSource>, cache: Arc<PayloadCache>) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &Arc<PayloadCache> {
        &self.cache
    }

    pub async fn fetch(
        &self,
        endpoint: EndpointKey,
        credentials: &Credentials,
        range: Option<&DateRange>,
    ) -> FetchResult<serde_json::Value> {
        let key = CacheKey::new(endpoint, range.copied(), credentials);
        self.cache
            .get_or_fetch(key, || self.source.fetch(endpoint, credentials, range))
            .await
    }

    /// Bulk invalidation, e.g. on a user-requested refresh.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all().await;
    }
}
