use crate::domain::{ListPayload, ListState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// Merge a fetched list into its state region.
///
/// The payload is stored under its cache key, becomes the current item list
/// and is unioned into `items`. Payload fields are shallow-merged into the
/// region; everything else is carried over unchanged. The cache key is
/// opaque, so any string (including `""`) is a valid key.
pub fn cache_list_reducer<Id>(state: &ListState<Id>, payload: &ListPayload<Id>) -> ListState<Id>
where
    Id: Clone + Eq + Hash,
{
    let mut next = state.clone();
    next.extra
        .extend(payload.extra.iter().map(|(k, v)| (k.clone(), v.clone())));
    next.cache_key = Some(payload.cache_key.clone());
    if let Some(last_updated) = payload.last_updated {
        next.last_updated = Some(last_updated);
    }
    next.cache.insert(payload.cache_key.clone(), payload.clone());
    next.current_items = payload.result.clone();
    next.items = union(&state.items, &payload.result);

    next
}

/// Order-preserving union without duplicates
fn union<Id>(existing: &[Id], incoming: &[Id]) -> Vec<Id>
where
    Id: Clone + Eq + Hash,
{
    let mut seen = HashSet::with_capacity(existing.len() + incoming.len());
    existing
        .iter()
        .chain(incoming)
        .filter(|id| seen.insert(*id))
        .cloned()
        .collect()
}

/// Lifecycle of a cacheable list fetch
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ListAction<Id, E> {
    Request,
    Success(ListPayload<Id>),
    Retrieve(ListPayload<E>),
    Invalidate,
}

/// Reducer for a list region
pub fn list_reducer<Id, E>(state: &ListState<Id>, action: &ListAction<Id, E>) -> ListState<Id>
where
    Id: Clone + Eq + Hash,
{
    match action {
        ListAction::Request => ListState {
            is_fetching: true,
            ..state.clone()
        },
        ListAction::Success(payload) => {
            let mut next = cache_list_reducer(state, payload);
            next.is_fetching = false;
            next.did_invalidate = false;
            next
        }
        ListAction::Retrieve(payload) => match state.cache.get(&payload.cache_key) {
            // `cache_key` and `current_items` always describe the same query
            Some(entry) => ListState {
                cache_key: Some(payload.cache_key.clone()),
                current_items: entry.result.clone(),
                is_fetching: false,
                ..state.clone()
            },
            None => state.clone(),
        },
        ListAction::Invalidate => ListState {
            did_invalidate: true,
            ..state.clone()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    type Action = ListAction<u32, String>;

    #[test]
    fn test_empty_cache_key_is_a_valid_key() {
        let state = ListState::<u32>::default();
        let payload = ListPayload::new("", vec![1, 2, 3]);

        let next = cache_list_reducer(&state, &payload);

        assert_eq!(next.cache.get(""), Some(&payload));
        assert_eq!(next.current_items, vec![1, 2, 3]);
        assert_eq!(next.cache_key.as_deref(), Some(""));
    }

    #[test]
    fn test_updates_cache_by_key() {
        let mut state = ListState::default();
        state.items = vec![2, 5];
        state.is_fetching = true;
        let payload = ListPayload::new("foo", vec![1, 2, 3]);

        let next = cache_list_reducer(&state, &payload);

        assert_eq!(next.cache.get("foo"), Some(&payload));
        assert_eq!(next.current_items, vec![1, 2, 3]);
        assert_eq!(next.items, vec![2, 5, 1, 3]);
        assert_eq!(next.cache_key.as_deref(), Some("foo"));
        // Unrelated fields survive
        assert!(next.is_fetching);
        // Input state is untouched
        assert!(state.cache.is_empty());
    }

    #[test]
    fn test_union_drops_existing_duplicates() {
        let mut state = ListState::default();
        state.items = vec![1, 1, 2];

        let next = cache_list_reducer(&state, &ListPayload::new("foo", vec![2, 3, 3]));

        assert_eq!(next.items, vec![1, 2, 3]);
        // current items are the fetched result as-is
        assert_eq!(next.current_items, vec![2, 3, 3]);
    }

    #[test]
    fn test_idempotent_for_identical_payload() {
        let payload = ListPayload::new("foo", vec![1, 2, 3]).with_last_updated(10);
        let once = cache_list_reducer(&ListState::default(), &payload);
        let twice = cache_list_reducer(&once, &payload);

        assert_eq!(once, twice);
        assert_eq!(twice.items, vec![1, 2, 3]);
    }

    #[test]
    fn test_payload_fields_merge_into_region() {
        let mut state = ListState::default().with_last_updated(5);
        state.extra.insert("page".to_string(), json!(1));
        state.extra.insert("filter".to_string(), json!("active"));

        let payload = ListPayload::new("foo", vec![7])
            .with_last_updated(99)
            .with_extra("page", 2);
        let next = cache_list_reducer(&state, &payload);

        assert_eq!(next.last_updated, Some(99));
        assert_eq!(next.extra["page"], json!(2));
        assert_eq!(next.extra["filter"], json!("active"));

        // Without a timestamp the previous one stays
        let next = cache_list_reducer(&next, &ListPayload::new("bar", vec![8]));
        assert_eq!(next.last_updated, Some(99));
        assert_eq!(next.cache.len(), 2);
    }

    #[test]
    fn test_list_reducer_lifecycle() {
        let state = ListState::default();

        let state = list_reducer(&state, &Action::Request);
        assert!(state.is_fetching);

        let success = Action::Success(ListPayload::new("q", vec![4, 5]).with_last_updated(100));
        let state = list_reducer(&state, &success);
        assert!(!state.is_fetching);
        assert_eq!(state.last_updated, Some(100));
        assert_eq!(state.current_items, vec![4, 5]);

        let state = list_reducer(&state, &Action::Invalidate);
        assert!(state.did_invalidate);

        let other = Action::Success(ListPayload::new("other", vec![6]));
        let state = list_reducer(&state, &other);
        assert!(!state.did_invalidate);
        assert_eq!(state.current_items, vec![6]);

        let retrieve = Action::Retrieve(ListPayload::new("q", vec!["d".to_string(), "e".to_string()]));
        let state = list_reducer(&state, &retrieve);
        assert_eq!(state.current_items, vec![4, 5]);
        assert_eq!(state.cache_key.as_deref(), Some("q"));
        assert_eq!(state.items, vec![4, 5, 6]);
    }

    #[test]
    fn test_retrieve_for_uncached_key_leaves_region_unchanged() {
        let state = list_reducer(
            &ListState::default(),
            &Action::Success(ListPayload::new("q", vec![4, 5])),
        );

        let retrieve = Action::Retrieve(ListPayload::new("missing", vec!["x".to_string()]));
        let next = list_reducer(&state, &retrieve);

        assert_eq!(next, state);
        assert_eq!(next.cache_key.as_deref(), Some("q"));
        assert_eq!(next.current_items, vec![4, 5]);
    }

    #[test]
    fn test_action_wire_shape() {
        let action = Action::Success(ListPayload::new("q", vec![1]));
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({ "type": "success", "payload": { "cacheKey": "q", "result": [1] } })
        );
        assert_eq!(
            serde_json::to_value(Action::Invalidate).unwrap(),
            json!({ "type": "invalidate" })
        );
    }
}
