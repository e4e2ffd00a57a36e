//! Time-bounded payload cache shared across sessions.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use ems_protocol::{Credentials, DateRange, EndpointKey};
use tokio::sync::{Mutex, RwLock};

use crate::error::FetchResult;

/// Default time-to-live for cached payloads.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Cache key: endpoint, optional date range, and a fingerprint of the
/// credentials used.
///
/// Payloads fetched under one username/password pair are never served to
/// another pair. The key holds a hash, not the password.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub endpoint: EndpointKey,
    pub range: Option<DateRange>,
    pub credential: String,
}

impl CacheKey {
    pub fn new(endpoint: EndpointKey, range: Option<DateRange>, credentials: &Credentials) -> Self {
        Self {
            endpoint,
            range,
            credential: credentials.fingerprint(),
        }
    }
}

struct CachedPayload {
    value: serde_json::Value,
    stored_at: Instant,
}

/// TTL cache of successful fetches. Errors are never cached.
///
/// Concurrent misses on the same key are coalesced: one caller fetches,
/// the others wait and read its result.
pub struct PayloadCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CachedPayload>>,
    inflight: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl PayloadCache {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Live (non-expired) payload for `key`, if any.
    pub async fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|p| p.stored_at.elapsed() < self.ttl)
            .map(|p| p.value.clone())
    }

    /// Return the cached payload, or run `fetch` and cache its success.
    ///
    /// The entry map is not locked while `fetch` runs; only the per-key
    /// gate is held.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: CacheKey,
        fetch: F,
    ) -> FetchResult<serde_json::Value>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = FetchResult<serde_json::Value>>,
    {
        if let Some(value) = self.get(&key).await {
            tracing::debug!(endpoint = %key.endpoint, cache = "hit", "payload cache");
            return Ok(value);
        }

        let gate = self.inflight.lock().await.entry(key.clone()).or_default().clone();
        let _guard = gate.lock().await;
        if let Some(value) = self.get(&key).await {
            tracing::debug!(endpoint = %key.endpoint, cache = "hit", "payload cache (coalesced)");
            return Ok(value);
        }
        tracing::debug!(endpoint = %key.endpoint, cache = "miss", "payload cache");

        let result = fetch().await;
        if let Ok(value) = &result {
            let mut entries = self.entries.write().await;
            let ttl = self.ttl;
            entries.retain(|_, p| p.stored_at.elapsed() < ttl);
            entries.insert(
                key.clone(),
                CachedPayload {
                    value: value.clone(),
                    stored_at: Instant::now(),
                },
            );
        }
        self.inflight.lock().await.remove(&key);
        result
    }

    /// Drop every entry for one endpoint.
    pub async fn invalidate(&self, endpoint: EndpointKey) {
        self.entries.write().await.retain(|k, _| k.endpoint != endpoint);
    }

    /// Drop everything.
    pub async fn invalidate_all(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "payload cache cleared");
    }

    /// Number of live entries.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries
            .values()
            .filter(|p| p.stored_at.elapsed() < self.ttl)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for PayloadCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn key(endpoint: EndpointKey) -> CacheKey {
        let range = DateRange::parse("2024-01-01", "2024-01-07").unwrap();
        CacheKey::new(endpoint, Some(range), &Credentials::new("ingeniero", "secreto"))
    }

    #[tokio::test]
    async fn hit_within_ttl_skips_fetch() {
        let cache = PayloadCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;

        for _ in 0..3 {
            let value = cache
                .get_or_fetch(key(EndpointKey::Moldes), move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(json!({"molde": "A"}))
                })
                .await
                .unwrap();
            assert_eq!(value, json!({"molde": "A"}));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entry_refetches() {
        let cache = PayloadCache::with_ttl(Duration::from_millis(40));
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!(1))
        };

        cache.get_or_fetch(key(EndpointKey::Summary), fetch).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(cache.get(&key(EndpointKey::Summary)).await.is_none());
        cache.get_or_fetch(key(EndpointKey::Summary), fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = PayloadCache::new();
        let err = cache
            .get_or_fetch(key(EndpointKey::LineaBase), || async {
                Err(FetchError::http_status(503, "busy"))
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::HttpStatus { code: 503, .. }));
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn keys_distinguish_ranges_and_users() {
        let cache = PayloadCache::new();
        let other_range = CacheKey::new(
            EndpointKey::Moldes,
            Some(DateRange::parse("2024-02-01", "2024-02-07").unwrap()),
            &Credentials::new("ingeniero", "secreto"),
        );
        let range = key(EndpointKey::Moldes).range;
        let other_user = Credentials::new("otro", "secreto");
        let other_user = CacheKey::new(EndpointKey::Moldes, range, &other_user);
        let wrong_password = Credentials::new("ingeniero", "WRONG");
        let other_password = CacheKey::new(EndpointKey::Moldes, range, &wrong_password);

        cache.get_or_fetch(key(EndpointKey::Moldes), || async { Ok(json!(1)) }).await.unwrap();
        cache.get_or_fetch(other_range, || async { Ok(json!(2)) }).await.unwrap();
        cache.get_or_fetch(other_user, || async { Ok(json!(3)) }).await.unwrap();
        let value = cache.get_or_fetch(other_password, || async { Ok(json!(4)) }).await.unwrap();
        assert_eq!(value, json!(4));
        assert_eq!(cache.len().await, 4);
    }

    #[tokio::test]
    async fn key_does_not_hold_password() {
        let creds = Credentials::new("ana", "p4ssw0rd");
        let key = CacheKey::new(EndpointKey::Summary, None, &creds);
        assert!(!format!("{key:?}").contains("p4ssw0rd"));
    }

    #[tokio::test]
    async fn concurrent_misses_fetch_once() {
        let cache = PayloadCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            Ok(json!({"molde": "B"}))
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_fetch(key(EndpointKey::Moldes), fetch),
            cache.get_or_fetch(key(EndpointKey::Moldes), fetch),
            cache.get_or_fetch(key(EndpointKey::Moldes), fetch),
        );
        assert_eq!(a.unwrap(), json!({"molde": "B"}));
        assert_eq!(b.unwrap(), json!({"molde": "B"}));
        assert_eq!(c.unwrap(), json!({"molde": "B"}));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn waiter_refetches_after_failed_leader() {
        let cache = PayloadCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            if n == 0 {
                Err(FetchError::http_status(503, "busy"))
            } else {
                Ok(json!("ok"))
            }
        };

        let (a, b) = tokio::join!(
            cache.get_or_fetch(key(EndpointKey::Summary), fetch),
            cache.get_or_fetch(key(EndpointKey::Summary), fetch),
        );
        assert!(a.is_err());
        assert_eq!(b.unwrap(), json!("ok"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn invalidate_single_endpoint() {
        let cache = PayloadCache::new();
        cache.get_or_fetch(key(EndpointKey::Moldes), || async { Ok(json!(1)) }).await.unwrap();
        cache.get_or_fetch(key(EndpointKey::Summary), || async { Ok(json!(2)) }).await.unwrap();

        cache.invalidate(EndpointKey::Moldes).await;
        assert!(cache.get(&key(EndpointKey::Moldes)).await.is_none());
        assert_eq!(cache.get(&key(EndpointKey::Summary)).await, Some(json!(2)));
    }

    #[tokio::test]
    async fn invalidate_all_forces_refetch() {
        let cache = PayloadCache::new();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(json!("x"))
        };

        cache.get_or_fetch(key(EndpointKey::Referencias), fetch).await.unwrap();
        cache.invalidate_all().await;
        assert!(cache.is_empty().await);
        cache.get_or_fetch(key(EndpointKey::Referencias), fetch).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
