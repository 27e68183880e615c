#![deny(clippy::all)]

//! TTL-guarded list caching on top of a normalized entity store.
//!
//! [`cache_list_action`] decides, before a list fetch, whether the cached
//! result for a query is still fresh. [`cache_list_reducer`] merges a fetched
//! list into the keyed cache map and the region's item collection.

pub mod action;
pub mod domain;
pub mod events;
pub mod ports;
pub mod reducer;
pub mod store;

pub use action::{
    CacheListActions, CacheListConfig, CacheListConfigBuilder, CacheLookup, CachedList,
    MissReason, cache_list_action,
};
pub use domain::{AppState, CacheKeys, EntityMap, ListPayload, ListState};
pub use reducer::{ListAction, cache_list_reducer, list_reducer};
pub use shared::{Error, Result, TtlMs};
pub use store::InMemoryStore;
