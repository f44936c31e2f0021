//! Configuration for the sync client.

use std::time::Duration;

use url::Url;

use crate::fetch::RetryPolicy;

/// Default API root, matching the development server.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Configuration for caching and fetching behavior.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Root every request path is joined onto.
    pub base_url: Url,

    /// How long a success stays fresh before a new `query` refetches it.
    ///
    /// `None` means successes never age out by time: only tag invalidation
    /// (or an explicit refetch) doubts them.
    pub stale_time: Option<Duration>,

    /// How long an entry with no subscribers is retained before
    /// `collect_garbage` may evict it.
    pub cache_time: Duration,

    /// Transport-error retry at the fetch boundary.
    pub retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base url parses"),
            stale_time: None,                        // fresh until invalidated
            cache_time: Duration::from_secs(5 * 60), // 5 minutes
            retry: RetryPolicy::default(),
        }
    }
}

impl SyncConfig {
    /// Creates a configuration for the given API root.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            ..Self::default()
        }
    }

    /// Sets the freshness window.
    #[must_use]
    pub const fn stale_time(mut self, stale_time: Option<Duration>) -> Self {
        self.stale_time = stale_time;
        self
    }

    /// Sets the idle retention window.
    #[must_use]
    pub const fn cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time;
        self
    }

    /// Sets the transport retry policy.
    #[must_use]
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
