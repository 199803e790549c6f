//! The cache core: fetch driver, subscription lifecycle, invalidation.
//!
//! `Cache::new` returns an owned instance with no hidden global state, so
//! independent caches (one per API, as in a multi-slice frontend) can
//! coexist in one process and in tests.

pub mod handle;
pub mod manager;

pub use handle::{MutationHandle, QueryHandle, Subscription};
pub use manager::Cache;
