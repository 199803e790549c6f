//! Tags and the tag index.
//!
//! Cached results declare the tags they depend on; mutations name the tags
//! they invalidate. The index maps tags back to query keys so "invalidate
//! everything for tag T" is a bucket lookup rather than a full scan.
//!
//! A tag without an id is the coarse form: invalidating `{kind}` resolves
//! every key registered under `{kind, *}` as well as `{kind}` exactly.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::key::QueryKey;

/// Dependency label attached to cached results.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub kind: String,
    pub id: Option<String>,
}

impl Tag {
    /// Coarse tag covering every instance of a kind.
    pub fn kind(kind: impl Into<String>) -> Self {
        Tag {
            kind: kind.into(),
            id: None,
        }
    }

    /// Fine tag naming one instance of a kind.
    pub fn entry(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Tag {
            kind: kind.into(),
            id: Some(id.into()),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{}({})", self.kind, id),
            None => f.write_str(&self.kind),
        }
    }
}

/// Maps tags to the query keys whose results provided them.
///
/// Holds back-references only; cache entries own their data. Buckets are
/// keyed per kind so coarse resolution is one bucket scan, and empty
/// buckets are pruned as keys are removed.
#[derive(Debug, Default)]
pub struct TagIndex {
    // kind -> id bucket -> keys; the `None` bucket holds keys that
    // provided the coarse tag exactly.
    kinds: HashMap<String, HashMap<Option<String>, HashSet<QueryKey>>>,
    // Reverse map so removing a key prunes every tag set it appears in.
    by_key: HashMap<QueryKey, Vec<Tag>>,
}

impl TagIndex {
    /// Replace the tags indexed for `key` with `tags`.
    pub fn index(&mut self, key: &QueryKey, tags: &[Tag]) {
        self.remove_key(key);
        if tags.is_empty() {
            return;
        }
        for tag in tags {
            self.kinds
                .entry(tag.kind.clone())
                .or_default()
                .entry(tag.id.clone())
                .or_default()
                .insert(key.clone());
        }
        self.by_key.insert(key.clone(), tags.to_vec());
    }

    /// Remove `key` from every tag set it appears in, pruning empty buckets.
    pub fn remove_key(&mut self, key: &QueryKey) {
        let Some(tags) = self.by_key.remove(key) else {
            return;
        };
        for tag in tags {
            let Some(buckets) = self.kinds.get_mut(&tag.kind) else {
                continue;
            };
            if let Some(keys) = buckets.get_mut(&tag.id) {
                keys.remove(key);
                if keys.is_empty() {
                    buckets.remove(&tag.id);
                }
            }
            if buckets.is_empty() {
                self.kinds.remove(&tag.kind);
            }
        }
    }

    /// Resolve `tags` to the union of affected query keys.
    ///
    /// A coarse tag resolves every bucket of its kind; a fine tag resolves
    /// only its own bucket.
    pub fn resolve(&self, tags: &[Tag]) -> HashSet<QueryKey> {
        let mut affected = HashSet::new();
        for tag in tags {
            let Some(buckets) = self.kinds.get(&tag.kind) else {
                continue;
            };
            match &tag.id {
                None => {
                    for keys in buckets.values() {
                        affected.extend(keys.iter().cloned());
                    }
                }
                Some(_) => {
                    if let Some(keys) = buckets.get(&tag.id) {
                        affected.extend(keys.iter().cloned());
                    }
                }
            }
        }
        affected
    }
}
