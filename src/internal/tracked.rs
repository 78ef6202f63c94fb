//! Append-only record of every instance the container has produced.

use parking_lot::Mutex;

use crate::error::DisposeError;
use crate::key::Key;
use crate::traits::Dispose;
use crate::AnyArc;

/// Type-erased release hook captured when a `Dispose` type is registered.
pub(crate) type ReleaseFn = fn(&AnyArc) -> Result<(), DisposeError>;

pub(crate) fn release_fn<T: Dispose>() -> ReleaseFn {
    |instance: &AnyArc| match (**instance).downcast_ref::<T>() {
        Some(value) => value.dispose(),
        None => Err(format!("tracked instance is not a {}", std::any::type_name::<T>()).into()),
    }
}

pub(crate) struct TrackedInstance {
    pub(crate) key: Key,
    pub(crate) instance: AnyArc,
    pub(crate) release: Option<ReleaseFn>,
}

/// Tracked instances in production order.
///
/// Guarded by its own lock, independent of the registry shards and of any
/// activator state, because evaluations of different entries append
/// concurrently.
#[derive(Default)]
pub(crate) struct TrackedInstances {
    entries: Mutex<Vec<TrackedInstance>>,
}

impl TrackedInstances {
    pub(crate) fn push(&self, key: Key, instance: AnyArc, release: Option<ReleaseFn>) {
        self.entries.lock().push(TrackedInstance { key, instance, release });
    }

    /// Removes and returns every entry, leaving the list empty.
    pub(crate) fn take(&self) -> Vec<TrackedInstance> {
        std::mem::take(&mut *self.entries.lock())
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub(crate) fn has_releasable(&self) -> bool {
        self.entries.lock().iter().any(|t| t.release.is_some())
    }
}
