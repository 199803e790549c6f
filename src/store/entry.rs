//! Cache entries and the per-entry state machine.
//!
//! `Idle --(subscribe)--> Pending --(success)--> Fulfilled`,
//! `Pending --(failure)--> Rejected`,
//! `Fulfilled|Rejected --(invalidate, subscribers)--> Pending` with
//! last-known data retained, and eviction once the last subscriber has been
//! gone for the grace delay.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;

use crate::endpoint::QueryDef;
use crate::executor::FetchError;
use crate::tag::Tag;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Idle,
    Pending,
    Fulfilled,
    Rejected,
}

/// Consumer-facing snapshot of one entry.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<FetchError>,
    /// True exactly while the generation-current request is in flight,
    /// independent of whether stale `data` is still being shown.
    pub is_fetching: bool,
    /// When `data` was last fetched successfully.
    pub fetched_at: Option<DateTime<Utc>>,
}

impl QueryState {
    fn idle() -> Self {
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            is_fetching: false,
            fetched_at: None,
        }
    }
}

pub(crate) struct CacheEntry {
    pub status: QueryStatus,
    pub data: Option<Value>,
    pub error: Option<FetchError>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub subscriber_count: usize,
    /// Tags recorded at the last successful fetch. Retained through failures
    /// so invalidation can still find and retry the key.
    pub provides: Vec<Tag>,
    pub stale: bool,
    /// Generation of the most recently issued request for this key.
    /// Completions from older generations are discarded.
    pub generation: u64,
    /// Generation currently in flight, if any.
    pub in_flight: Option<u64>,
    /// Bumped whenever an eviction timer is scheduled or cancelled; a timer
    /// only fires if its epoch is still current.
    pub evict_epoch: u64,
    /// The definition and argument this entry was created for, so
    /// invalidation can re-drive the fetch without the original caller.
    pub def: Arc<QueryDef>,
    pub arg: Value,
    notifier: watch::Sender<QueryState>,
}

impl CacheEntry {
    pub fn new(def: Arc<QueryDef>, arg: Value) -> Self {
        let (notifier, _) = watch::channel(QueryState::idle());
        Self {
            status: QueryStatus::Idle,
            data: None,
            error: None,
            fetched_at: None,
            subscriber_count: 0,
            provides: Vec::new(),
            stale: false,
            generation: 0,
            in_flight: None,
            evict_epoch: 0,
            def,
            arg,
            notifier,
        }
    }

    pub fn snapshot(&self) -> QueryState {
        QueryState {
            status: self.status,
            data: self.data.clone(),
            error: self.error.clone(),
            is_fetching: self.in_flight.is_some(),
            fetched_at: self.fetched_at,
        }
    }

    pub fn watch(&self) -> watch::Receiver<QueryState> {
        self.notifier.subscribe()
    }

    /// Push the current snapshot to all watchers.
    pub fn publish(&self) {
        self.notifier.send_replace(self.snapshot());
    }
}
