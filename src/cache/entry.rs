//! Cache entry state and the snapshots subscribers observe.

use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::watch;

use crate::error::ApiError;
use crate::tag::Tag;

/// Lifecycle of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Created but never fetched.
    Idle,
    /// An exchange is outstanding. Previously fetched data stays visible.
    Loading,
    /// The latest exchange succeeded and the data is current.
    Success,
    /// The latest exchange failed. The last successful data, if any, stays
    /// visible alongside the error.
    Error,
    /// A previous success was invalidated (by tag or by age) and is doubted
    /// until refetched.
    Stale,
}

impl CacheStatus {
    /// Returns `true` if an exchange is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Returns `true` if the latest exchange succeeded and is current.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    /// Returns `true` if the latest exchange failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error)
    }

    /// Returns `true` if the entry holds an invalidated success.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::Stale)
    }

    /// Returns `true` once at least one exchange has settled.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        matches!(self, Self::Success | Self::Error | Self::Stale)
    }
}

/// A point-in-time view of one cache entry.
///
/// `generation` counts settles: it is zero until the first exchange settles
/// and increments on every success or error stored afterwards. Waiters use
/// it to tell "settled since I subscribed" from "settled before".
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySnapshot {
    pub status: CacheStatus,
    pub data: Option<Value>,
    pub error: Option<ApiError>,
    pub generation: u64,
}

impl QuerySnapshot {
    pub(crate) const fn idle() -> Self {
        Self {
            status: CacheStatus::Idle,
            data: None,
            error: None,
            generation: 0,
        }
    }

    /// Returns `true` if an exchange is outstanding.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.status.is_loading()
    }

    /// Returns `true` if the latest exchange succeeded and is current.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns `true` if the latest exchange failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.status.is_error()
    }

    /// Returns `true` once at least one exchange has settled.
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        self.status.is_settled()
    }
}

/// One cache entry: the watched snapshot plus the bookkeeping the engine
/// needs. Mutated only by the cache engine, under the map's entry lock.
pub(crate) struct Entry {
    tx: watch::Sender<QuerySnapshot>,
    pub(crate) args: Value,
    pub(crate) provided_tags: Vec<Tag>,
    subscribers: usize,
    /// Ticket of the exchange queries may join, if one is outstanding.
    pub(crate) inflight: Option<u64>,
    last_success_at: Option<Instant>,
    idle_since: Option<Instant>,
}

impl Entry {
    pub(crate) fn new(args: Value, provided_tags: Vec<Tag>) -> Self {
        let (tx, _rx) = watch::channel(QuerySnapshot::idle());
        Self {
            tx,
            args,
            provided_tags,
            subscribers: 0,
            inflight: None,
            last_success_at: None,
            idle_since: Some(Instant::now()),
        }
    }

    pub(crate) fn snapshot(&self) -> QuerySnapshot {
        self.tx.borrow().clone()
    }

    pub(crate) fn subscribe(&mut self) -> watch::Receiver<QuerySnapshot> {
        self.subscribers += 1;
        self.idle_since = None;
        self.tx.subscribe()
    }

    pub(crate) fn unsubscribe(&mut self) {
        self.subscribers = self.subscribers.saturating_sub(1);
        if self.subscribers == 0 {
            self.idle_since = Some(Instant::now());
        }
    }

    pub(crate) const fn subscriber_count(&self) -> usize {
        self.subscribers
    }

    /// Marks an exchange outstanding. Data and error stay visible.
    pub(crate) fn begin_loading(&mut self) {
        self.tx.send_modify(|snap| snap.status = CacheStatus::Loading);
    }

    pub(crate) fn store_success(&mut self, data: Value) {
        self.last_success_at = Some(Instant::now());
        self.tx.send_modify(|snap| {
            snap.status = CacheStatus::Success;
            snap.data = Some(data);
            snap.error = None;
            snap.generation += 1;
        });
    }

    /// Stores a failure. The last successful data stays visible.
    pub(crate) fn store_error(&mut self, error: ApiError) {
        self.tx.send_modify(|snap| {
            snap.status = CacheStatus::Error;
            snap.error = Some(error);
            snap.generation += 1;
        });
    }

    /// Doubts a held success. Entries in any other state are left as they
    /// are; there is nothing settled to doubt.
    pub(crate) fn mark_stale(&mut self) {
        if self.snapshot().status.is_success() {
            self.tx.send_modify(|snap| snap.status = CacheStatus::Stale);
        }
    }

    /// Whether a held success is still fresh. `None` means data never ages
    /// out by time and only invalidation doubts it.
    pub(crate) fn is_fresh(&self, stale_time: Option<Duration>) -> bool {
        if !self.snapshot().status.is_success() {
            return false;
        }
        match (stale_time, self.last_success_at) {
            (None, _) => true,
            (Some(window), Some(at)) => at.elapsed() <= window,
            (Some(_), None) => false,
        }
    }

    /// Whether this entry may be evicted: nobody subscribed, nothing in
    /// flight, and the idle window has elapsed.
    pub(crate) fn should_gc(&self, cache_time: Duration) -> bool {
        self.subscribers == 0
            && self.inflight.is_none()
            && self
                .idle_since
                .is_some_and(|since| since.elapsed() > cache_time)
    }
}
