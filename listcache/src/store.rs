use crate::domain::AppState;
use crate::ports::{Dispatcher, StateReader};
use shared::Result;
use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock};

pub type Reducer<Id, E, A> =
    Arc<dyn Fn(&AppState<Id, E>, &A) -> Result<AppState<Id, E>> + Send + Sync>;

/// Minimal unidirectional store: every action runs through one reducer and
/// replaces the state snapshot.
pub struct InMemoryStore<Id, E, A> {
    state: RwLock<Arc<AppState<Id, E>>>,
    reducer: Reducer<Id, E, A>,
}

impl<Id, E, A> InMemoryStore<Id, E, A> {
    pub fn new(
        initial: AppState<Id, E>,
        reducer: impl Fn(&AppState<Id, E>, &A) -> Result<AppState<Id, E>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: RwLock::new(Arc::new(initial)),
            reducer: Arc::new(reducer),
        }
    }

    /// Apply an action, returning the reducer's error instead of logging it
    pub fn try_dispatch(&self, action: &A) -> Result<()> {
        // Writers are serialized here; readers keep their old snapshot
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let next = (self.reducer)(&**state, action)?;
        *state = Arc::new(next);
        Ok(())
    }

    pub fn snapshot(&self) -> Arc<AppState<Id, E>> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl<Id, E, A> Dispatcher<A> for InMemoryStore<Id, E, A>
where
    Id: Send + Sync,
    E: Send + Sync,
    A: Debug,
{
    fn dispatch(&self, action: A) {
        if let Err(err) = self.try_dispatch(&action) {
            tracing::warn!("Reducer rejected {:?}: {}", action, err);
        }
    }
}

impl<Id, E, A> StateReader<Id, E> for InMemoryStore<Id, E, A>
where
    Id: Send + Sync,
    E: Send + Sync,
{
    fn get_state(&self) -> Arc<AppState<Id, E>> {
        self.snapshot()
    }
}

impl<Id, E, A> Debug for InMemoryStore<Id, E, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryStore")
            .field("state", &"<RwLock<Arc<AppState>>>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ListPayload, ListState};
    use shared::Error;
    use crate::reducer::{ListAction, list_reducer};

    type Action = ListAction<u32, String>;

    fn store() -> InMemoryStore<u32, String, Action> {
        InMemoryStore::new(AppState::new(), |state: &AppState<u32, String>, action: &Action| {
            // Application reducers may reject payloads they cannot use
            if let Action::Success(payload) = action
                && payload.result.is_empty()
            {
                return Err(Error::InvalidPayload("empty page".to_string()));
            }
            let region = state.region("list").cloned().unwrap_or_default();
            let mut next = state.clone();
            next.regions
                .insert("list".to_string(), list_reducer(&region, action));
            Ok(next)
        })
    }

    #[test]
    fn test_dispatch_replaces_snapshot() {
        let store = store();
        let before = store.get_state();

        store.dispatch(Action::Success(ListPayload::new("q", vec![1, 2])));

        let after = store.get_state();
        assert!(before.region("list").is_none());
        assert_eq!(after.region("list").unwrap().items, vec![1, 2]);
    }

    #[test]
    fn test_rejected_action_keeps_state() {
        let store = store();
        store.dispatch(Action::Request);

        let result = store.try_dispatch(&Action::Success(ListPayload::new("q", vec![])));
        assert!(result.is_err());

        // Dispatch swallows the error after logging it
        store.dispatch(Action::Success(ListPayload::new("q", vec![])));

        let snapshot = store.snapshot();
        let region: &ListState<u32> = snapshot.region("list").unwrap();
        assert!(region.is_fetching);
        assert!(region.items.is_empty());
    }
}
