use crate::domain::{CacheKeys, ListPayload};
use crate::events::{
    self, CacheHitEvent, CacheMissEvent, CacheStaleEvent, ListCacheEvent,
};
use crate::ports::{Clock, Dispatcher, StateReader, SystemClock};
use shared::config::{Config, DEFAULT_CACHE_EXPIRE_TIME};
use shared::time::format_utc_time;
use shared::{Error, Result, TtlMs};
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

pub use crate::events::MissReason;

pub type RetrieveFn<A, E> = Arc<dyn Fn(ListPayload<E>) -> A + Send + Sync>;
pub type InvalidateFn<A> = Arc<dyn Fn() -> A + Send + Sync>;

/// Action creators supplied by the caller
pub struct CacheListActions<A, E> {
    /// Builds the action that replays cached data as if freshly fetched
    pub retrieve: RetrieveFn<A, E>,
    /// Builds the action that kicks off a refetch
    pub invalidate: InvalidateFn<A>,
}

impl<A, E> CacheListActions<A, E> {
    pub fn new(
        retrieve: impl Fn(ListPayload<E>) -> A + Send + Sync + 'static,
        invalidate: impl Fn() -> A + Send + Sync + 'static,
    ) -> Self {
        Self {
            retrieve: Arc::new(retrieve),
            invalidate: Arc::new(invalidate),
        }
    }
}

impl<A, E> Clone for CacheListActions<A, E> {
    fn clone(&self) -> Self {
        Self {
            retrieve: Arc::clone(&self.retrieve),
            invalidate: Arc::clone(&self.invalidate),
        }
    }
}

/// Settings for a single cached list lookup
pub struct CacheListConfig<A, E> {
    pub keys: CacheKeys,
    pub actions: CacheListActions<A, E>,
    pub cache_expire_time: TtlMs,
    pub clock: Arc<dyn Clock>,
    pub event_broadcaster: Option<broadcast::Sender<ListCacheEvent>>,
}

impl<A, E> CacheListConfig<A, E> {
    pub fn builder() -> CacheListConfigBuilder<A, E> {
        CacheListConfigBuilder::default()
    }
}

impl<A, E> Clone for CacheListConfig<A, E> {
    fn clone(&self) -> Self {
        Self {
            keys: self.keys.clone(),
            actions: self.actions.clone(),
            cache_expire_time: self.cache_expire_time,
            clock: Arc::clone(&self.clock),
            event_broadcaster: self.event_broadcaster.clone(),
        }
    }
}

impl<A, E> Debug for CacheListConfig<A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheListConfig")
            .field("keys", &self.keys)
            .field("cache_expire_time", &self.cache_expire_time)
            .field("events", &self.event_broadcaster.is_some())
            .finish()
    }
}

pub struct CacheListConfigBuilder<A, E> {
    keys: Option<CacheKeys>,
    actions: Option<CacheListActions<A, E>>,
    cache_expire_time: Option<TtlMs>,
    clock: Option<Arc<dyn Clock>>,
    event_broadcaster: Option<broadcast::Sender<ListCacheEvent>>,
}

impl<A, E> Default for CacheListConfigBuilder<A, E> {
    fn default() -> Self {
        Self {
            keys: None,
            actions: None,
            cache_expire_time: None,
            clock: None,
            event_broadcaster: None,
        }
    }
}

impl<A, E> CacheListConfigBuilder<A, E> {
    /// Start from process settings (freshness window)
    pub fn from_settings(settings: &Config) -> Self {
        Self::default().cache_expire_time(settings.cache_expire_time)
    }

    pub fn keys(mut self, keys: CacheKeys) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn actions(mut self, actions: CacheListActions<A, E>) -> Self {
        self.actions = Some(actions);
        self
    }

    pub fn cache_expire_time(mut self, ttl: TtlMs) -> Self {
        self.cache_expire_time = Some(ttl);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn event_broadcaster(mut self, broadcaster: broadcast::Sender<ListCacheEvent>) -> Self {
        self.event_broadcaster = Some(broadcaster);
        self
    }

    pub fn build(self) -> Result<CacheListConfig<A, E>> {
        let keys = self.keys.ok_or_else(|| {
            Error::InvalidConfig(
                "`keys` must contain `cacheKey`, `entitiesKey` and `reducerKey`".to_string(),
            )
        })?;
        keys.validate()?;

        let actions = self.actions.ok_or_else(|| {
            Error::InvalidConfig(
                "`actions.retrieve` and `actions.invalidate` must be provided".to_string(),
            )
        })?;

        Ok(CacheListConfig {
            keys,
            actions,
            cache_expire_time: self.cache_expire_time.unwrap_or(DEFAULT_CACHE_EXPIRE_TIME),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            event_broadcaster: self.event_broadcaster,
        })
    }
}

/// Handle to a fresh cached list. Retrieving consumes it, so the retrieve
/// action is dispatched at most once.
pub struct CachedList<A, E> {
    dispatch: Arc<dyn Dispatcher<A>>,
    retrieve: RetrieveFn<A, E>,
    payload: ListPayload<E>,
}

impl<A, E> CachedList<A, E> {
    pub fn payload(&self) -> &ListPayload<E> {
        &self.payload
    }

    /// Dispatch the retrieve action with the cached payload
    pub fn retrieve(self) {
        let action = (self.retrieve)(self.payload);
        self.dispatch.dispatch(action);
    }
}

impl<A, E: Debug> Debug for CachedList<A, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedList")
            .field("payload", &self.payload)
            .finish()
    }
}

/// Outcome of a cached list lookup
#[derive(Debug)]
pub enum CacheLookup<A, E> {
    /// Fresh data is available; call [`CachedList::retrieve`] instead of fetching
    Hit(CachedList<A, E>),
    /// Freshness window exceeded; the invalidate action has been dispatched
    Stale,
    /// Nothing usable is cached
    Miss(MissReason),
}

impl<A, E> CacheLookup<A, E> {
    pub fn is_hit(&self) -> bool {
        matches!(self, CacheLookup::Hit(_))
    }

    pub fn into_cached(self) -> Option<CachedList<A, E>> {
        match self {
            CacheLookup::Hit(cached) => Some(cached),
            _ => None,
        }
    }
}

/// Check the list cache before fetching.
///
/// Reads the region under `keys.reducer_key`. When its `last_updated` is older
/// than the freshness window the invalidate action is dispatched and
/// [`CacheLookup::Stale`] is returned. Otherwise the cache entry under
/// `keys.cache_key` is resolved against the entity map under
/// `keys.entities_key`; only an entry whose ids are all present yields a hit.
///
/// # Example
///
/// ```ignore
/// let config = CacheListConfig::builder()
///     .keys(CacheKeys::new(query_key, "profiles", "ManageProfiles"))
///     .actions(CacheListActions::new(ListAction::Retrieve, || ListAction::Invalidate))
///     .build()?;
///
/// match cache_list_action(dispatch, store.as_ref(), &config)? {
///     CacheLookup::Hit(cached) => cached.retrieve(),
///     _ => fetch_profiles(),
/// }
/// ```
pub fn cache_list_action<A, Id, E, S>(
    dispatch: Arc<dyn Dispatcher<A>>,
    get_state: &S,
    config: &CacheListConfig<A, E>,
) -> Result<CacheLookup<A, E>>
where
    Id: Eq + Hash,
    E: Clone,
    S: StateReader<Id, E> + ?Sized,
{
    let keys = &config.keys;
    keys.validate()?;

    let state = get_state.get_state();
    let now = config.clock.now_ms();
    let broadcaster = config.event_broadcaster.as_ref();

    let miss = |reason: MissReason| {
        debug!(
            "List cache miss @ {} for '{}': {:?}",
            keys.reducer_key, keys.cache_key, reason
        );
        events::publish(
            broadcaster,
            ListCacheEvent::Miss(CacheMissEvent {
                reducer_key: keys.reducer_key.clone(),
                cache_key: keys.cache_key.clone(),
                reason,
                timestamp: now,
            }),
        );
        Ok(CacheLookup::Miss(reason))
    };

    let Some(region) = state.region(&keys.reducer_key) else {
        return miss(MissReason::RegionMissing);
    };

    let Some(last_updated) = region.last_updated else {
        return miss(MissReason::NeverFetched);
    };

    // Timestamps from the future count as fresh
    let age_ms = now.saturating_sub(last_updated);
    if age_ms > config.cache_expire_time.0 {
        info!(
            "List cache @ {} is stale (last updated {}, {}ms > {}ms), invalidating",
            keys.reducer_key,
            format_utc_time(last_updated),
            age_ms,
            config.cache_expire_time.0
        );
        dispatch.dispatch((config.actions.invalidate)());
        events::publish(
            broadcaster,
            ListCacheEvent::Stale(CacheStaleEvent {
                reducer_key: keys.reducer_key.clone(),
                cache_key: keys.cache_key.clone(),
                age_ms,
                timestamp: now,
            }),
        );
        return Ok(CacheLookup::Stale);
    }

    let Some(entry) = region.cache.get(&keys.cache_key) else {
        return miss(MissReason::NoEntry);
    };

    let Some(entities) = state.entities(&keys.entities_key) else {
        return miss(MissReason::EntitiesMissing);
    };

    let Some(result) = entry
        .result
        .iter()
        .map(|id| entities.get(id).cloned())
        .collect::<Option<Vec<E>>>()
    else {
        return miss(MissReason::PartialEntities);
    };

    debug!(
        "List cache hit @ {} for '{}' ({} item(s))",
        keys.reducer_key,
        keys.cache_key,
        result.len()
    );
    events::publish(
        broadcaster,
        ListCacheEvent::Hit(CacheHitEvent {
            reducer_key: keys.reducer_key.clone(),
            cache_key: keys.cache_key.clone(),
            item_count: result.len(),
            timestamp: now,
        }),
    );

    let payload = ListPayload {
        cache_key: keys.cache_key.clone(),
        result,
        last_updated: entry.last_updated,
        extra: entry.extra.clone(),
    };

    Ok(CacheLookup::Hit(CachedList {
        dispatch,
        retrieve: Arc::clone(&config.actions.retrieve),
        payload,
    }))
}
