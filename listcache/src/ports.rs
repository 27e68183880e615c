use crate::domain::AppState;
use shared::time::current_timestamp_ms;
use std::sync::Arc;

// Ports are the seams to the enclosing state store

/// Port for pushing actions into the state store (fire-and-forget)
pub trait Dispatcher<A>: Send + Sync {
    fn dispatch(&self, action: A);
}

/// Port for reading the current state snapshot
pub trait StateReader<Id, E>: Send + Sync {
    fn get_state(&self) -> Arc<AppState<Id, E>>;
}

/// Port for the wall clock used by freshness checks
pub trait Clock: Send + Sync {
    /// Milliseconds since Unix epoch
    fn now_ms(&self) -> u64;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        current_timestamp_ms()
    }
}

/// A fixed snapshot reads as itself
impl<Id, E> StateReader<Id, E> for Arc<AppState<Id, E>>
where
    Id: Send + Sync,
    E: Send + Sync,
{
    fn get_state(&self) -> Arc<AppState<Id, E>> {
        Arc::clone(self)
    }
}
