//! Consumer-facing handles.
//!
//! Registering an endpoint yields a [`QueryHandle`] or [`MutationHandle`];
//! subscribing to a query yields a [`Subscription`] whose lifetime governs
//! the entry's subscriber count. There is no framework dependency here: any
//! UI layer calls `subscribe`/`release` from its own lifecycle hooks.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::cache::manager::CacheInner;
use crate::endpoint::{MutationDef, QueryDef};
use crate::executor::FetchError;
use crate::key::QueryKey;
use crate::store::{QueryState, QueryStatus};

/// Handle for a registered query endpoint.
/// Clone is cheap - clones share the cache and the definition.
#[derive(Clone)]
pub struct QueryHandle {
    inner: Arc<CacheInner>,
    def: Arc<QueryDef>,
}

impl QueryHandle {
    pub(crate) fn new(inner: Arc<CacheInner>, def: Arc<QueryDef>) -> Self {
        Self { inner, def }
    }

    /// Subscribe to this query for the given argument.
    ///
    /// Creates the cache entry if absent and drives a fetch unless the entry
    /// is already fresh or a request for it is in flight.
    pub fn subscribe(&self, arg: impl Serialize) -> Result<Subscription> {
        let arg = serde_json::to_value(arg).context("failed to serialize query argument")?;
        Ok(self.inner.subscribe(&self.def, arg))
    }

    /// Force a new request regardless of the entry's current status.
    pub fn refetch(&self, arg: impl Serialize) -> Result<()> {
        let arg = serde_json::to_value(arg).context("failed to serialize query argument")?;
        self.inner.refetch(&self.def, arg);
        Ok(())
    }
}

/// Handle for a registered mutation endpoint.
#[derive(Clone)]
pub struct MutationHandle {
    inner: Arc<CacheInner>,
    def: Arc<MutationDef>,
}

impl MutationHandle {
    pub(crate) fn new(inner: Arc<CacheInner>, def: Arc<MutationDef>) -> Self {
        Self { inner, def }
    }

    /// Execute the mutation and return its outcome directly.
    ///
    /// On success the declared tags are invalidated; a failure invalidates
    /// nothing. Triggered refetches complete independently - this future
    /// does not wait for them.
    pub async fn trigger(&self, arg: impl Serialize) -> Result<Value, FetchError> {
        let arg = serde_json::to_value(arg).map_err(|e| FetchError::Parse(e.to_string()))?;
        let request = self.def.build_request(&arg);
        let outcome = self.inner.executor().execute(request).await;
        if outcome.is_ok() {
            let tags = self.def.invalidated_tags(&arg);
            if !tags.is_empty() {
                debug!(mutation = self.def.id(), tags = ?tags, "mutation succeeded, invalidating");
                self.inner.invalidate(&tags);
            }
        }
        outcome
    }
}

/// A live reference to one query key's cache entry.
///
/// Holds the entry's subscriber count up by one until released. Dropping an
/// unreleased subscription releases it.
pub struct Subscription {
    inner: Arc<CacheInner>,
    key: QueryKey,
    receiver: watch::Receiver<QueryState>,
    released: bool,
}

impl Subscription {
    pub(crate) fn new(
        inner: Arc<CacheInner>,
        key: QueryKey,
        receiver: watch::Receiver<QueryState>,
    ) -> Self {
        Self {
            inner,
            key,
            receiver,
            released: false,
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Latest snapshot for this entry.
    pub fn current(&self) -> QueryState {
        self.receiver.borrow().clone()
    }

    /// Wait for the next state change.
    ///
    /// Returns `None` once the entry has been evicted.
    pub async fn changed(&mut self) -> Option<QueryState> {
        self.receiver.changed().await.ok()?;
        Some(self.current())
    }

    /// Wait until the entry settles: fulfilled or rejected, with no request
    /// in flight.
    pub async fn settled(&mut self) -> QueryState {
        loop {
            let state = self.current();
            let done = matches!(state.status, QueryStatus::Fulfilled | QueryStatus::Rejected)
                && !state.is_fetching;
            if done {
                return state;
            }
            if self.receiver.changed().await.is_err() {
                // entry evicted; return whatever we last saw
                return self.current();
            }
        }
    }

    /// Drop this subscription's reference on the entry. The last reference
    /// out starts the eviction grace timer.
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.inner.release(&self.key);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release_once();
    }
}
