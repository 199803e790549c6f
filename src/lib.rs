//! querycache - a client-side data synchronization cache.
//!
//! Turns declared remote-data endpoints into a shared, invalidation-aware
//! cache with automatic request deduplication, subscriber lifecycle
//! tracking, and tag-based freshness control. The cache decides *when* to
//! call the network, *how many times*, and how results are shared and
//! expired; the actual transport is a pluggable dependency.
//!
//! ```no_run
//! use std::sync::Arc;
//! use querycache::{Cache, CacheConfig, MutationDef, QueryDef, Request, Tag, TokenStore};
//!
//! # async fn run() -> anyhow::Result<()> {
//! let tokens = TokenStore::new();
//! let cache = Cache::new(CacheConfig::new("https://api.example.com"), Arc::new(tokens))?;
//!
//! let names = cache.register_query(Arc::new(
//!     QueryDef::new("getKnowledgeNames", |_| Request::get("/v1/knowledges/list"))
//!         .provides(|_| vec![Tag::kind("KnowledgeNames")]),
//! ))?;
//! let create = cache.register_mutation(Arc::new(
//!     MutationDef::new("createKnowledge", |arg| Request::post("/v1/knowledges", arg.clone()))
//!         .invalidates(|_| vec![Tag::kind("KnowledgeNames")]),
//! ))?;
//!
//! let mut list = names.subscribe(())?;
//! let _names = list.settled().await.data;
//!
//! // a successful create marks the list stale and refetches it in the
//! // background; `list` keeps showing the old data until the refetch lands
//! create.trigger(serde_json::json!({ "name": "kb-1" })).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod executor;
pub mod key;
pub mod store;
pub mod tag;

pub use auth::{NoToken, TokenProvider, TokenStore};
pub use cache::{Cache, MutationHandle, QueryHandle, Subscription};
pub use config::CacheConfig;
pub use endpoint::{MutationDef, QueryDef, RegistryError};
pub use executor::{
    FetchError, HttpTransport, RawResponse, Request, RequestExecutor, Transport, TransportError,
};
pub use key::QueryKey;
pub use store::{QueryState, QueryStatus};
pub use tag::Tag;
