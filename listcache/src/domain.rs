use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared::{Error, Result};
use std::collections::HashMap;
use std::hash::Hash;

/// Normalized entities of one type, keyed by identifier
pub type EntityMap<Id, E> = HashMap<Id, E>;

/// Locates a cached list inside application state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheKeys {
    pub cache_key: String,    // serialized query identifying the list
    pub entities_key: String, // entity type in the normalized store
    pub reducer_key: String,  // state region owning the cache map
}

impl CacheKeys {
    pub fn new(
        cache_key: impl Into<String>,
        entities_key: impl Into<String>,
        reducer_key: impl Into<String>,
    ) -> Self {
        Self {
            cache_key: cache_key.into(),
            entities_key: entities_key.into(),
            reducer_key: reducer_key.into(),
        }
    }

    /// The cache key is opaque and may be any string; the other two name
    /// places in state and must not be empty.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("entitiesKey", &self.entities_key),
            ("reducerKey", &self.reducer_key),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "`{name}` must be a non-empty string"
                )));
            }
        }
        Ok(())
    }
}

/// A fetched list. `result` holds entity ids while cached and the entities
/// themselves once retrieved.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListPayload<T> {
    pub cache_key: String,
    pub result: Vec<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<T> ListPayload<T> {
    pub fn new(cache_key: impl Into<String>, result: Vec<T>) -> Self {
        Self {
            cache_key: cache_key.into(),
            result,
            last_updated: None,
            extra: Map::new(),
        }
    }

    pub fn with_last_updated(mut self, timestamp_ms: u64) -> Self {
        self.last_updated = Some(timestamp_ms);
        self
    }

    /// Attach an arbitrary payload field (page counts, totals, ...)
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// State region for one cacheable list
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListState<Id> {
    pub cache: HashMap<String, ListPayload<Id>>,
    pub current_items: Vec<Id>,
    pub items: Vec<Id>,
    #[serde(default)]
    pub cache_key: Option<String>,
    #[serde(default)]
    pub last_updated: Option<u64>,
    #[serde(default)]
    pub is_fetching: bool,
    #[serde(default)]
    pub did_invalidate: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl<Id> Default for ListState<Id> {
    fn default() -> Self {
        Self {
            cache: HashMap::new(),
            current_items: Vec::new(),
            items: Vec::new(),
            cache_key: None,
            last_updated: None,
            is_fetching: false,
            did_invalidate: false,
            extra: Map::new(),
        }
    }
}

impl<Id> ListState<Id> {
    pub fn with_last_updated(mut self, timestamp_ms: u64) -> Self {
        self.last_updated = Some(timestamp_ms);
        self
    }

    pub fn with_entry(mut self, entry: ListPayload<Id>) -> Self {
        self.cache.insert(entry.cache_key.clone(), entry);
        self
    }
}

/// Snapshot of application state as seen by the list cache
#[derive(Clone, Debug)]
pub struct AppState<Id, E> {
    pub entities: HashMap<String, EntityMap<Id, E>>,
    pub regions: HashMap<String, ListState<Id>>,
}

impl<Id, E> Default for AppState<Id, E> {
    fn default() -> Self {
        Self {
            entities: HashMap::new(),
            regions: HashMap::new(),
        }
    }
}

impl<Id, E> AppState<Id, E>
where
    Id: Eq + Hash,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, reducer_key: impl Into<String>, region: ListState<Id>) -> Self {
        self.regions.insert(reducer_key.into(), region);
        self
    }

    pub fn with_entities(
        mut self,
        entities_key: impl Into<String>,
        entities: impl IntoIterator<Item = (Id, E)>,
    ) -> Self {
        self.merge_entities(entities_key, entities);
        self
    }

    pub fn region(&self, reducer_key: &str) -> Option<&ListState<Id>> {
        self.regions.get(reducer_key)
    }

    pub fn entities(&self, entities_key: &str) -> Option<&EntityMap<Id, E>> {
        self.entities.get(entities_key)
    }

    /// Upsert entities of one type into the normalized store
    pub fn merge_entities(
        &mut self,
        entities_key: impl Into<String>,
        entities: impl IntoIterator<Item = (Id, E)>,
    ) {
        self.entities
            .entry(entities_key.into())
            .or_default()
            .extend(entities);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_keys_validation() {
        assert!(CacheKeys::new("q", "profiles", "ManageProfiles").validate().is_ok());
        assert!(CacheKeys::new("", "profiles", "ManageProfiles").validate().is_ok());

        let err = CacheKeys::new("q", "", "ManageProfiles").validate().unwrap_err();
        assert_eq!(
            err,
            Error::InvalidConfig("`entitiesKey` must be a non-empty string".to_string())
        );
    }

    #[test]
    fn test_payload_serializes_camel_case_with_extra_fields() {
        let payload = ListPayload::new("page-1", vec![1, 2])
            .with_last_updated(42)
            .with_extra("total", 10);

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({ "cacheKey": "page-1", "result": [1, 2], "lastUpdated": 42, "total": 10 })
        );

        let back: ListPayload<u32> = serde_json::from_value(value).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn test_merge_entities_upserts() {
        let mut state: AppState<u32, &str> =
            AppState::new().with_entities("profiles", [(1, "ada"), (2, "brian")]);

        state.merge_entities("profiles", [(2, "bjarne"), (3, "carol")]);

        let profiles = state.entities("profiles").unwrap();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles[&2], "bjarne");
        assert!(state.entities("teams").is_none());
    }
}
