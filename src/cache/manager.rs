//! The cache itself: entry bookkeeping, the fetch driver, invalidation and
//! eviction.
//!
//! All bookkeeping happens behind one lock that is never held across an
//! await point, so every entry transition is atomic with respect to the
//! others. Network calls and eviction timers run as spawned tasks and
//! re-acquire the lock when they complete; between issuing a request and its
//! completion the cache keeps servicing subscribes, releases and
//! invalidations, which is exactly why the one-in-flight-request-per-key
//! rule exists.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::TokenProvider;
use crate::cache::handle::{MutationHandle, QueryHandle, Subscription};
use crate::config::CacheConfig;
use crate::endpoint::{MutationDef, QueryDef, Registry, RegistryError};
use crate::executor::{FetchError, HttpTransport, RequestExecutor, Transport};
use crate::key::QueryKey;
use crate::store::entry::QueryStatus;
use crate::store::{CacheEntry, StoreState};
use crate::tag::Tag;

/// An invalidation-aware client cache over declared endpoints.
///
/// Must be used from within a Tokio runtime: fetches and eviction timers
/// are spawned tasks.
pub struct Cache {
    inner: Arc<CacheInner>,
}

impl Cache {
    /// Create a cache that talks HTTP to `config.base_url`.
    pub fn new(config: CacheConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self> {
        let transport =
            HttpTransport::new(&config.base_url).context("failed to build HTTP transport")?;
        Ok(Self::with_transport(config, Arc::new(transport), tokens))
    }

    /// Create a cache over an injected transport.
    pub fn with_transport(
        config: CacheConfig,
        transport: Arc<dyn Transport>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                config,
                executor: RequestExecutor::new(transport, tokens),
                registry: Mutex::new(Registry::default()),
                state: Mutex::new(StoreState::default()),
            }),
        }
    }

    /// Register a query endpoint, returning its subscription handle.
    ///
    /// Registering the identical definition again is a no-op; a different
    /// definition under an existing id fails fast.
    pub fn register_query(&self, def: Arc<QueryDef>) -> Result<QueryHandle, RegistryError> {
        self.inner.lock_registry().insert_query(&def)?;
        Ok(QueryHandle::new(Arc::clone(&self.inner), def))
    }

    /// Register a mutation endpoint, returning its trigger handle.
    pub fn register_mutation(
        &self,
        def: Arc<MutationDef>,
    ) -> Result<MutationHandle, RegistryError> {
        self.inner.lock_registry().insert_mutation(&def)?;
        Ok(MutationHandle::new(Arc::clone(&self.inner), def))
    }

    /// Imperatively mark every entry under `tags` stale, refetching the ones
    /// with active subscribers.
    pub fn invalidate(&self, tags: &[Tag]) {
        self.inner.invalidate(tags);
    }
}

pub(crate) struct CacheInner {
    config: CacheConfig,
    executor: RequestExecutor,
    registry: Mutex<Registry>,
    state: Mutex<StoreState>,
}

impl CacheInner {
    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_registry(&self) -> MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Add a subscriber to the entry for (def, arg), creating it at `Idle`
    /// if absent, and drive a fetch if the entry is not fresh.
    pub(crate) fn subscribe(self: &Arc<Self>, def: &Arc<QueryDef>, arg: Value) -> Subscription {
        let key = QueryKey::derive(def.id(), &arg);
        let receiver = {
            let mut state = self.lock_state();
            let entry = state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(Arc::clone(def), arg));
            entry.subscriber_count += 1;
            // cancels any eviction timer scheduled for this entry
            entry.evict_epoch += 1;
            debug!(key = %key, subscribers = entry.subscriber_count, "subscribed");
            entry.watch()
        };
        self.ensure_fresh(&key, false);
        Subscription::new(Arc::clone(self), key, receiver)
    }

    /// Drop one subscriber reference; the last one out schedules eviction
    /// after the grace delay.
    pub(crate) fn release(self: &Arc<Self>, key: &QueryKey) {
        let epoch = {
            let mut state = self.lock_state();
            let Some(entry) = state.entries.get_mut(key) else {
                return;
            };
            entry.subscriber_count = entry.subscriber_count.saturating_sub(1);
            debug!(key = %key, subscribers = entry.subscriber_count, "released");
            if entry.subscriber_count > 0 {
                None
            } else {
                entry.evict_epoch += 1;
                Some(entry.evict_epoch)
            }
        };
        if let Some(epoch) = epoch {
            self.schedule_eviction(key.clone(), epoch);
        }
    }

    /// Force a new request for (def, arg) regardless of current status,
    /// creating the entry if absent.
    pub(crate) fn refetch(self: &Arc<Self>, def: &Arc<QueryDef>, arg: Value) {
        let key = QueryKey::derive(def.id(), &arg);
        {
            let mut state = self.lock_state();
            state
                .entries
                .entry(key.clone())
                .or_insert_with(|| CacheEntry::new(Arc::clone(def), arg));
        }
        self.ensure_fresh(&key, true);
    }

    /// The fetch driver.
    ///
    /// Without `force`: a fulfilled, non-stale entry is a cache hit, and an
    /// entry with a request already in flight is joined rather than
    /// re-fetched - deduplication is keyed solely by the query key. With
    /// `force` a new generation is issued unconditionally, superseding any
    /// in-flight request; the superseded completion is dropped by the
    /// generation check, not aborted at the transport level.
    pub(crate) fn ensure_fresh(self: &Arc<Self>, key: &QueryKey, force: bool) {
        let (generation, def, arg) = {
            let mut state = self.lock_state();
            let Some(entry) = state.entries.get_mut(key) else {
                return;
            };
            if !force {
                if entry.status == QueryStatus::Fulfilled && !entry.stale {
                    return;
                }
                if entry.in_flight.is_some() {
                    // all current and new subscribers observe the same flight
                    return;
                }
            }
            entry.generation += 1;
            entry.in_flight = Some(entry.generation);
            // last-known data and error stay visible while the fetch runs
            entry.status = QueryStatus::Pending;
            entry.stale = false;
            entry.publish();
            (entry.generation, Arc::clone(&entry.def), entry.arg.clone())
        };

        debug!(key = %key, generation, "issuing request");

        let inner = Arc::clone(self);
        let key = key.clone();
        tokio::spawn(async move {
            let request = def.build_request(&arg);
            let outcome = match inner.executor.execute(request).await {
                Ok(raw) => def.parse_payload(raw).map_err(FetchError::Parse),
                Err(err) => Err(err),
            };
            inner.apply_completion(&key, generation, outcome);
        });
    }

    /// Apply a completed request, unless a newer request for the key has
    /// been issued in the meantime.
    ///
    /// An invalidation that landed while this request was in flight leaves
    /// the entry stale; if subscribers are present by now the deferred
    /// refetch is driven here, since no later subscribe will (they join
    /// flights instead of starting them).
    fn apply_completion(
        self: &Arc<Self>,
        key: &QueryKey,
        generation: u64,
        outcome: Result<Value, FetchError>,
    ) {
        let (evict_epoch, redrive) = {
            let mut state = self.lock_state();
            let StoreState { entries, tags } = &mut *state;
            let Some(entry) = entries.get_mut(key) else {
                debug!(key = %key, generation, "entry evicted before completion");
                return;
            };
            if generation != entry.generation {
                debug!(
                    key = %key,
                    generation,
                    current = entry.generation,
                    "discarding superseded result"
                );
                return;
            }
            entry.in_flight = None;
            match outcome {
                Ok(data) => {
                    entry.status = QueryStatus::Fulfilled;
                    entry.data = Some(data);
                    entry.error = None;
                    entry.fetched_at = Some(Utc::now());
                    entry.provides = entry.def.provided_tags(&entry.arg);
                    tags.index(key, &entry.provides);
                    debug!(key = %key, generation, "request fulfilled");
                }
                Err(error) => {
                    warn!(key = %key, generation, error = %error, "request rejected");
                    entry.status = QueryStatus::Rejected;
                    entry.error = Some(error);
                    // tags from the last success stay indexed so
                    // invalidation can still find and retry this key
                }
            }
            entry.publish();
            if entry.subscriber_count == 0 {
                // everyone unsubscribed while the fetch was pending; the
                // result is cached anyway and ages out on the normal clock
                entry.evict_epoch += 1;
                (Some(entry.evict_epoch), false)
            } else {
                (None, entry.stale)
            }
        };
        if let Some(epoch) = evict_epoch {
            self.schedule_eviction(key.clone(), epoch);
        }
        if redrive {
            debug!(key = %key, "driving refetch deferred by mid-flight invalidation");
            self.ensure_fresh(key, true);
        }
    }

    /// Mark every entry under `tags` stale. Entries with active subscribers
    /// refetch immediately in the background (their last-known data stays
    /// visible); entries without subscribers wait for the next subscribe.
    ///
    /// The affected-key set is computed synchronously; the refetches
    /// complete independently and in any order.
    pub(crate) fn invalidate(self: &Arc<Self>, tags: &[Tag]) {
        let refetch = {
            let mut state = self.lock_state();
            let StoreState { entries, tags: index } = &mut *state;
            let affected = index.resolve(tags);
            debug!(tags = ?tags, affected = affected.len(), "invalidating");
            let mut refetch = Vec::new();
            for key in affected {
                let Some(entry) = entries.get_mut(&key) else {
                    continue;
                };
                entry.stale = true;
                if entry.subscriber_count > 0 {
                    refetch.push(key);
                }
            }
            refetch
        };
        for key in refetch {
            self.ensure_fresh(&key, true);
        }
    }

    fn schedule_eviction(self: &Arc<Self>, key: QueryKey, epoch: u64) {
        let inner = Arc::clone(self);
        let grace = self.config.keep_unused_for;
        tokio::spawn(async move {
            tokio::time::sleep(grace).await;
            inner.evict_if_unused(&key, epoch);
        });
    }

    fn evict_if_unused(&self, key: &QueryKey, epoch: u64) {
        let mut state = self.lock_state();
        let Some(entry) = state.entries.get(key) else {
            return;
        };
        if entry.subscriber_count > 0 || entry.evict_epoch != epoch {
            // a subscriber came back, or a newer timer owns this entry
            return;
        }
        if entry.in_flight.is_some() {
            // let the fetch land; its completion reschedules eviction
            return;
        }
        debug!(key = %key, "evicting unused entry");
        state.evict(key);
    }
}
