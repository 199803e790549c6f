//! Cache store: one entry per unique (endpoint, argument) pair.
//!
//! The store exclusively owns all entries; the tag index holds only
//! back-references. Removing an entry prunes it from every tag set it
//! appears in.

pub mod entry;

pub use entry::{QueryState, QueryStatus};

pub(crate) use entry::CacheEntry;

use std::collections::HashMap;

use crate::key::QueryKey;
use crate::tag::TagIndex;

/// Entries plus tag back-references, mutated only behind the cache's lock.
#[derive(Default)]
pub(crate) struct StoreState {
    pub entries: HashMap<QueryKey, CacheEntry>,
    pub tags: TagIndex,
}

impl StoreState {
    /// Drop an entry and every tag reference to it.
    pub fn evict(&mut self, key: &QueryKey) {
        self.entries.remove(key);
        self.tags.remove_key(key);
    }
}
