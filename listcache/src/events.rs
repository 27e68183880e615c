use serde::{Deserialize, Serialize};
use shared::config::{Config, MAX_EVENT_CAPACITY};
use tokio::sync::broadcast;

/// Why a lookup could not be served from cache
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissReason {
    /// The state has no region under `reducer_key`
    RegionMissing,
    /// The region was never stamped with `last_updated`
    NeverFetched,
    /// No cache entry under `cache_key`
    NoEntry,
    /// The normalized store has no map under `entities_key`
    EntitiesMissing,
    /// Some cached ids are absent from the entity map
    PartialEntities,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ListCacheEvent {
    Hit(CacheHitEvent),
    Stale(CacheStaleEvent),
    Miss(CacheMissEvent),
}

impl ListCacheEvent {
    pub fn reducer_key(&self) -> &str {
        match self {
            ListCacheEvent::Hit(e) => &e.reducer_key,
            ListCacheEvent::Stale(e) => &e.reducer_key,
            ListCacheEvent::Miss(e) => &e.reducer_key,
        }
    }

    pub fn cache_key(&self) -> &str {
        match self {
            ListCacheEvent::Hit(e) => &e.cache_key,
            ListCacheEvent::Stale(e) => &e.cache_key,
            ListCacheEvent::Miss(e) => &e.cache_key,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheHitEvent {
    pub reducer_key: String,
    pub cache_key: String,
    pub item_count: usize,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStaleEvent {
    pub reducer_key: String,
    pub cache_key: String,
    pub age_ms: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMissEvent {
    pub reducer_key: String,
    pub cache_key: String,
    pub reason: MissReason,
    pub timestamp: u64,
}

/// Create an event channel sized from configuration
pub fn channel(config: &Config) -> (broadcast::Sender<ListCacheEvent>, broadcast::Receiver<ListCacheEvent>) {
    broadcast::channel(config.event_capacity.clamp(1, MAX_EVENT_CAPACITY))
}

pub(crate) fn publish(broadcaster: Option<&broadcast::Sender<ListCacheEvent>>, event: ListCacheEvent) {
    let Some(broadcaster) = broadcaster else {
        return;
    };

    let cache_key = event.cache_key().to_string();
    match broadcaster.send(event) {
        Ok(subscriber_count) => {
            tracing::trace!(
                "Broadcasted list cache event for '{}' to {} subscriber(s)",
                cache_key,
                subscriber_count
            );
        }
        Err(_) => {
            tracing::debug!("No subscribers for list cache event on '{}'", cache_key);
        }
    }
}
