//! The sync engine: cached queries, mutations, and tag invalidation.
//!
//! # Design Pattern: Subscription-based State Management
//!
//! Reads are **subscriptions**, not one-shot calls. When you subscribe to a
//! query:
//!
//! 1. A held fresh success is emitted immediately, with no network call
//! 2. Otherwise exactly one exchange runs per cache key, however many
//!    callers subscribe while it is in flight
//! 3. When a mutation invalidates one of the entry's tags, the entry is
//!    doubted and, while anyone is subscribed, refetched automatically
//!
//! Writes go through [`SyncClient::mutate`]: always a fresh exchange, never
//! cached. A successful mutation fans its invalidated tags out across the
//! cache; a failed one leaves every entry untouched. Failures are data, not
//! control flow: subscribers observe them as snapshots.
//!
//! # Example
//!
//! ```rust,ignore
//! use lectern::client::SyncClient;
//! use serde_json::json;
//!
//! let client = SyncClient::new(registry, fetcher, dispatcher, config);
//!
//! let mut lectures = client.query("course.getLectures", json!({"courseId": "C1"}))?;
//! let snapshot = lectures.settled().await;
//!
//! client
//!     .mutate("course.createLecture", json!({"courseId": "C1", "lectureTitle": "Intro"}))
//!     .await?;
//! // The lecture list above is now refetching; await the next snapshot.
//! let refreshed = lectures.settled().await;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

use crate::cache::{CacheKey, Entry, QuerySnapshot, SyncConfig};
use crate::endpoint::{EndpointDescriptor, Registry, RegistryError};
use crate::error::ApiError;
use crate::fetch::Fetcher;
use crate::hooks::{Dispatcher, Settled};
use crate::tag::{Tag, any_match};

/// The process-wide query/mutation cache.
///
/// Cheap to clone; all clones share one cache, one endpoint registry, one
/// fetch executor, and one hook dispatcher. Queries and refetches spawn
/// exchanges onto the ambient Tokio runtime, so every method that can start
/// a fetch must be called from within one.
#[derive(Clone)]
pub struct SyncClient {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    fetcher: Fetcher,
    dispatcher: Dispatcher,
    entries: DashMap<CacheKey, Entry>,
    config: SyncConfig,
    tickets: AtomicU64,
}

impl SyncClient {
    /// Creates a client over a validated registry.
    #[must_use]
    pub fn new(
        registry: Registry,
        fetcher: Fetcher,
        dispatcher: Dispatcher,
        config: SyncConfig,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                fetcher,
                dispatcher,
                entries: DashMap::new(),
                config,
                tickets: AtomicU64::new(1),
            }),
        }
    }

    /// Subscribes to a query endpoint.
    ///
    /// A fresh cached success is served without a network call. Otherwise
    /// the entry loads: either by joining the exchange already in flight for
    /// this key or by starting the single new one. The returned subscription
    /// sees the current snapshot immediately and every later transition.
    pub fn query(&self, endpoint: &str, args: Value) -> Result<QuerySubscription, RegistryError> {
        let descriptor = self.inner.registry.get_query(endpoint)?.clone();
        let key = CacheKey::new(endpoint, &args);

        let mut entry = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(args.clone(), descriptor.provided_tags(&Value::Null, &args)));
        let rx = entry.subscribe();

        let join_inflight = entry.inflight.is_some();
        let fresh = entry.is_fresh(self.inner.config.stale_time);
        if !fresh && !join_inflight {
            let ticket = self.inner.next_ticket();
            entry.inflight = Some(ticket);
            entry.begin_loading();
            drop(entry);
            self.inner.spawn_exchange(descriptor, key.clone(), args, ticket);
        } else {
            debug!(%key, joined = join_inflight, "query served from cache");
            drop(entry);
        }

        Ok(QuerySubscription {
            client: self.clone(),
            key,
            rx,
            active: true,
        })
    }

    /// Runs a mutation endpoint.
    ///
    /// Mutations are never cached or deduplicated. The endpoint's hooks run
    /// once the exchange settles; on success, and only on success, its
    /// invalidated tags fan out across the cache. The settled outcome is
    /// returned either way — a failed exchange is an `Ok(settled)` carrying
    /// the error, not an `Err`.
    pub async fn mutate(&self, endpoint: &str, args: Value) -> Result<Settled, RegistryError> {
        let descriptor = self.inner.registry.get_mutation(endpoint)?.clone();

        let outcome = self.inner.exchange(&descriptor, &args).await;
        let settled = Settled::new(descriptor.name(), args.clone(), outcome);
        self.inner.dispatcher.dispatch(&settled);

        if settled.is_success() {
            let tags = descriptor.invalidated_tags(&args);
            if !tags.is_empty() {
                self.invalidate_tags(&tags);
            }
        }

        Ok(settled)
    }

    /// Forces a network call for a key, regardless of the entry's status.
    ///
    /// Never cancels an exchange already in flight; whichever settles last
    /// wins the entry. Refetching a key with no live entry creates one with
    /// no subscribers, priming the cache.
    pub fn refetch(&self, key: &CacheKey) -> Result<(), RegistryError> {
        let descriptor = self.inner.registry.get_query(key.endpoint())?.clone();
        let args = match self.inner.entries.get(key) {
            Some(entry) => entry.args.clone(),
            // Canonical argument text is JSON this crate produced.
            None => serde_json::from_str(key.canonical_args()).unwrap_or(Value::Null),
        };

        let mut entry = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| Entry::new(args.clone(), descriptor.provided_tags(&Value::Null, &args)));
        let ticket = self.inner.next_ticket();
        entry.inflight = Some(ticket);
        entry.begin_loading();
        drop(entry);

        self.inner.spawn_exchange(descriptor, key.clone(), args, ticket);
        Ok(())
    }

    /// Marks every entry whose provided tags intersect `tags` as stale, and
    /// refetches the ones with at least one active subscriber.
    ///
    /// Unsubscribed entries stay stale until the next `query` touches them.
    pub fn invalidate_tags(&self, tags: &[Tag]) {
        let mut refetch_keys = Vec::new();
        for mut entry in self.inner.entries.iter_mut() {
            if any_match(&entry.provided_tags, tags) {
                entry.mark_stale();
                if entry.subscriber_count() > 0 {
                    refetch_keys.push(entry.key().clone());
                }
            }
        }

        debug!(count = refetch_keys.len(), "invalidation fan-out");
        for key in refetch_keys {
            if let Err(e) = self.refetch(&key) {
                warn!(%key, "invalidation refetch skipped: {e}");
            }
        }
    }

    /// Peeks at an entry without subscribing.
    #[must_use]
    pub fn snapshot(&self, key: &CacheKey) -> Option<QuerySnapshot> {
        self.inner.entries.get(key).map(|entry| entry.snapshot())
    }

    /// Evicts entries that have had no subscribers for the configured
    /// `cache_time`. Returns how many were evicted.
    pub fn collect_garbage(&self) -> usize {
        let cache_time = self.inner.config.cache_time;
        // Counted per eviction, not by diffing map lengths: other tasks may
        // insert entries while the sweep runs.
        let mut evicted = 0;
        self.inner.entries.retain(|_, entry| {
            if entry.should_gc(cache_time) {
                evicted += 1;
                false
            } else {
                true
            }
        });
        if evicted > 0 {
            debug!(evicted, "cache garbage collected");
        }
        evicted
    }

    /// The client configuration.
    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    /// Number of live cache entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.inner.entries.len()
    }

    fn release(&self, key: &CacheKey) {
        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            entry.unsubscribe();
        }
    }
}

impl Inner {
    fn next_ticket(&self) -> u64 {
        self.tickets.fetch_add(1, Ordering::Relaxed)
    }

    fn spawn_exchange(
        self: &Arc<Self>,
        descriptor: Arc<EndpointDescriptor>,
        key: CacheKey,
        args: Value,
        ticket: u64,
    ) {
        let inner = self.clone();
        tokio::spawn(async move {
            let outcome = inner.exchange(&descriptor, &args).await;
            inner.settle_query(&descriptor, &key, args, ticket, outcome);
        });
    }

    /// One full exchange: build, fetch, shape.
    async fn exchange(
        &self,
        descriptor: &EndpointDescriptor,
        args: &Value,
    ) -> Result<Value, ApiError> {
        let spec = descriptor.build_request(args)?;
        let raw = self.fetcher.execute(&spec).await?;
        let shaped = descriptor.shape_response(raw)?;
        if shaped.is_defaulted() {
            warn!(
                endpoint = descriptor.name(),
                "malformed payload, endpoint default substituted"
            );
        }
        Ok(shaped.into_value())
    }

    /// Stores a query outcome, notifies subscribers, then runs hooks.
    ///
    /// Results apply in completion order: a slower exchange that settles
    /// after a newer one simply overwrites it. The in-flight marker is only
    /// cleared by the exchange that owns it, so an orphaned settle cannot
    /// release a newer exchange's claim.
    fn settle_query(
        self: &Arc<Self>,
        descriptor: &EndpointDescriptor,
        key: &CacheKey,
        args: Value,
        ticket: u64,
        outcome: Result<Value, ApiError>,
    ) {
        if let Some(mut entry) = self.entries.get_mut(key) {
            match &outcome {
                Ok(data) => {
                    // Result-derived tags only exist once data does.
                    entry.provided_tags = descriptor.provided_tags(data, &args);
                    entry.store_success(data.clone());
                }
                Err(e) => entry.store_error(e.clone()),
            }
            if entry.inflight == Some(ticket) {
                entry.inflight = None;
            }
        } else {
            debug!(%key, "entry evicted before settle; result dropped");
        }

        let settled = Settled::new(descriptor.name(), args, outcome);
        self.dispatcher.dispatch(&settled);
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("entries", &self.inner.entries.len())
            .field("endpoints", &self.inner.registry.len())
            .finish()
    }
}

/// A live subscription to one cache entry.
///
/// Dropping the subscription releases it; an entry with no subscriptions
/// left becomes eligible for garbage collection after the configured idle
/// window, but any exchange still in flight settles into the cache anyway.
pub struct QuerySubscription {
    client: SyncClient,
    key: CacheKey,
    rx: watch::Receiver<QuerySnapshot>,
    active: bool,
}

impl QuerySubscription {
    /// The cache key this subscription observes.
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// The entry's current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> QuerySnapshot {
        self.rx.borrow().clone()
    }

    /// Waits until the entry holds a settled snapshot and returns it.
    ///
    /// Returns immediately when the entry is already settled (including
    /// stale data awaiting a refetch). While an initial load is outstanding
    /// this waits for it to store a success or an error.
    pub async fn settled(&mut self) -> QuerySnapshot {
        loop {
            let snapshot = self.rx.borrow_and_update().clone();
            if snapshot.is_settled() {
                return snapshot;
            }
            if self.rx.changed().await.is_err() {
                // Entry evicted; the last snapshot is all there will be.
                return self.rx.borrow().clone();
            }
        }
    }

    /// Waits for the next snapshot transition.
    ///
    /// Returns `None` once the entry has been evicted.
    pub async fn changed(&mut self) -> Option<QuerySnapshot> {
        match self.rx.changed().await {
            Ok(()) => Some(self.rx.borrow_and_update().clone()),
            Err(_) => None,
        }
    }

    /// The subscription as a stream of snapshots, starting from the current
    /// one. The subscription itself must be kept alive alongside the stream.
    #[must_use]
    pub fn watch(&self) -> WatchStream<QuerySnapshot> {
        WatchStream::new(self.rx.clone())
    }

    /// Releases the subscription explicitly. Equivalent to dropping it.
    pub fn unsubscribe(mut self) {
        self.active = false;
        self.client.release(&self.key);
    }
}

impl Drop for QuerySubscription {
    fn drop(&mut self) {
        if self.active {
            self.client.release(&self.key);
        }
    }
}

impl std::fmt::Debug for QuerySubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuerySubscription")
            .field("key", &self.key.to_string())
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
