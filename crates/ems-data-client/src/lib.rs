//! Data access for the energy-management API.
//!
//! Provides the `DataSource` abstraction (HTTP with Basic auth, or an
//! in-memory mock for tests), a TTL `PayloadCache`, and the `DataFetcher`
//! that composes the two.

pub mod cache;
pub mod error;
pub mod fetcher;
pub mod mock;
pub mod source;

// Re-export key types for convenience
pub use cache::{CacheKey, DEFAULT_TTL, PayloadCache};
pub use error::{FetchError, FetchResult};
pub use fetcher::DataFetcher;
pub use mock::MockDataSource;
pub use source::{DEFAULT_TIMEOUT, DataSource, HttpDataSource};
