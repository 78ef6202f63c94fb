//! Compute-once activators backing registry entries.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::error::{DiError, DiResult};
use crate::internal::{cycle_path, panic_message, ReleaseFn, StackGuard};
use crate::key::Key;
use crate::{AnyArc, Container};

/// Type-erased constructor run by an activator.
pub(crate) type Ctor = Arc<dyn Fn(&Container) -> DiResult<AnyArc> + Send + Sync>;

enum State {
    Unevaluated,
    InProgress(ThreadId),
    Evaluated(AnyArc),
}

/// Deferred, single-execution computation for one registry entry.
///
/// The first caller moves the state to `InProgress` and runs the constructor
/// without holding the state lock; racing callers wait on `ready`. Success
/// tracks the instance and caches it forever. Failure or panic puts the
/// state back to `Unevaluated` and wakes the waiters so one of them retries.
///
/// Only same-thread re-entry is detected. A cycle split across threads (A
/// waiting on B on one thread, B waiting on A on another) blocks forever.
pub(crate) struct Activator {
    key: Key,
    ctor: Ctor,
    release: Option<ReleaseFn>,
    state: Mutex<State>,
    ready: Condvar,
}

enum Acquired<'a> {
    Ready(AnyArc),
    Owned(PendingGuard<'a>),
}

impl Activator {
    pub(crate) fn new(key: Key, ctor: Ctor, release: Option<ReleaseFn>) -> Self {
        Self {
            key,
            ctor,
            release,
            state: Mutex::new(State::Unevaluated),
            ready: Condvar::new(),
        }
    }

    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    pub(crate) fn key(&self) -> &Key {
        &self.key
    }

    /// True once evaluation has started. A locked entry must not be replaced.
    pub(crate) fn is_locked(&self) -> bool {
        !matches!(*self.state.lock(), State::Unevaluated)
    }

    pub(crate) fn is_evaluated(&self) -> bool {
        matches!(*self.state.lock(), State::Evaluated(_))
    }

    /// Moves an unevaluated activator to `InProgress` for this thread without
    /// waiting. Called while the registry guard is still held, so a
    /// concurrent `register` or `decorate` already sees the entry as locked.
    /// Dropping the claim unused returns the activator to `Unevaluated`.
    pub(crate) fn claim(&self) -> Option<PendingGuard<'_>> {
        let mut state = self.state.lock();
        match *state {
            State::Unevaluated => {
                *state = State::InProgress(thread::current().id());
                Some(PendingGuard { activator: self, armed: true })
            }
            _ => None,
        }
    }

    /// Waits until the activator is either evaluated or free to be built by
    /// this thread.
    fn acquire(&self, current: ThreadId) -> DiResult<Acquired<'_>> {
        let mut state = self.state.lock();
        loop {
            let owner = match &*state {
                State::Evaluated(value) => return Ok(Acquired::Ready(value.clone())),
                State::InProgress(owner) => *owner,
                State::Unevaluated => break,
            };
            if owner == current {
                return Err(DiError::Circular(cycle_path(self.key.display_name())));
            }
            self.ready.wait(&mut state);
        }
        *state = State::InProgress(current);
        Ok(Acquired::Owned(PendingGuard { activator: self, armed: true }))
    }

    /// Returns the cached instance, building it first if needed. `claim` is
    /// the result of an earlier [`claim`](Self::claim) on this activator.
    pub(crate) fn evaluate(
        &self,
        container: &Container,
        claim: Option<PendingGuard<'_>>,
    ) -> DiResult<AnyArc> {
        let name = self.key.display_name();
        let options = container.options();

        let mut pending = match claim {
            Some(pending) => pending,
            None => match self.acquire(thread::current().id())? {
                Acquired::Ready(value) => return Ok(value),
                Acquired::Owned(pending) => pending,
            },
        };

        let frame = if options.detect_cycles {
            Some(StackGuard::enter(name, options.max_depth)?)
        } else {
            None
        };

        let started = Instant::now();
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| (self.ctor)(container))) {
            Ok(result) => result,
            Err(payload) => {
                tracing::warn!(key = %self.key, panic = %panic_message(payload.as_ref()), "factory panicked");
                Err(DiError::FactoryPanicked(self.key))
            }
        };
        drop(frame);

        match outcome {
            Ok(value) => {
                container.tracked().push(self.key, value.clone(), self.release);
                *self.state.lock() = State::Evaluated(value.clone());
                pending.armed = false;
                self.ready.notify_all();
                let elapsed = started.elapsed();
                tracing::debug!(key = %self.key, ?elapsed, "instance created");
                container.observers().evaluated(&self.key, elapsed);
                Ok(value)
            }
            Err(error) => {
                drop(pending);
                container.observers().factory_failed(&self.key, &error);
                Err(error)
            }
        }
    }
}

/// Returns an in-progress activator to `Unevaluated` unless disarmed.
pub(crate) struct PendingGuard<'a> {
    activator: &'a Activator,
    armed: bool,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            *self.activator.state.lock() = State::Unevaluated;
            self.activator.ready.notify_all();
        }
    }
}
