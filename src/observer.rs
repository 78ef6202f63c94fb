//! Observer hooks for container lifecycle events.
//!
//! Observers see registrations, decorations, every resolution with its
//! timing, factory failures and teardown releases. They are called
//! synchronously from the thread performing the operation, so keep
//! implementations cheap.

use std::sync::Arc;
use std::time::Duration;

use crate::{DiError, Key};

/// Observer trait for container events.
///
/// Only the resolution hooks are required; the lifecycle hooks default to
/// no-ops.
///
/// # Examples
///
/// ```
/// use lodge_ioc::{Container, ContainerObserver, DiError, Key};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// #[derive(Default)]
/// struct CountingObserver {
///     resolutions: AtomicUsize,
/// }
///
/// impl ContainerObserver for CountingObserver {
///     fn resolving(&self, _key: &Key) {}
///
///     fn resolved(&self, _key: &Key, _duration: Duration) {
///         self.resolutions.fetch_add(1, Ordering::SeqCst);
///     }
///
///     fn factory_failed(&self, _key: &Key, _error: &DiError) {}
/// }
///
/// let observer = Arc::new(CountingObserver::default());
/// let container = Container::builder().observer(observer.clone()).build();
/// container.register::<u32, _>(|_| 7).unwrap();
/// container.resolve::<u32>().unwrap();
/// container.resolve::<u32>().unwrap();
///
/// assert_eq!(observer.resolutions.load(Ordering::SeqCst), 2);
/// ```
pub trait ContainerObserver: Send + Sync {
    /// Called before a key is looked up and, if needed, evaluated.
    fn resolving(&self, key: &Key);

    /// Called after a resolution succeeded.
    fn resolved(&self, key: &Key, duration: Duration);

    /// Called when a factory (or a decorator layer) failed or panicked.
    fn factory_failed(&self, key: &Key, error: &DiError);

    /// Called when a factory is installed. `replaced` is true when an
    /// unevaluated entry was overwritten.
    fn registered(&self, _key: &Key, _replaced: bool) {}

    /// Called when a decorator layer is installed.
    fn decorated(&self, _key: &Key) {}

    /// Called when an activator produced and tracked a new instance.
    fn evaluated(&self, _key: &Key, _duration: Duration) {}

    /// Called after a tracked instance was released during teardown.
    fn released(&self, _key: &Key) {}

    /// Called when releasing a tracked instance failed.
    fn release_failed(&self, _key: &Key, _message: &str) {}
}

/// Registered observers, notified in registration order.
#[derive(Default, Clone)]
pub(crate) struct Observers {
    observers: Vec<Arc<dyn ContainerObserver>>,
}

impl Observers {
    pub(crate) fn add(&mut self, observer: Arc<dyn ContainerObserver>) {
        self.observers.push(observer);
    }

    #[inline]
    pub(crate) fn has_observers(&self) -> bool {
        !self.observers.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.observers.len()
    }

    #[inline]
    pub(crate) fn resolving(&self, key: &Key) {
        for observer in &self.observers {
            observer.resolving(key);
        }
    }

    #[inline]
    pub(crate) fn resolved(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.resolved(key, duration);
        }
    }

    pub(crate) fn factory_failed(&self, key: &Key, error: &DiError) {
        for observer in &self.observers {
            observer.factory_failed(key, error);
        }
    }

    pub(crate) fn registered(&self, key: &Key, replaced: bool) {
        for observer in &self.observers {
            observer.registered(key, replaced);
        }
    }

    pub(crate) fn decorated(&self, key: &Key) {
        for observer in &self.observers {
            observer.decorated(key);
        }
    }

    pub(crate) fn evaluated(&self, key: &Key, duration: Duration) {
        for observer in &self.observers {
            observer.evaluated(key, duration);
        }
    }

    pub(crate) fn released(&self, key: &Key) {
        for observer in &self.observers {
            observer.released(key);
        }
    }

    pub(crate) fn release_failed(&self, key: &Key, message: &str) {
        for observer in &self.observers {
            observer.release_failed(key, message);
        }
    }
}

/// Built-in observer that forwards every event to `tracing`.
///
/// Resolutions are emitted at `TRACE`, lifecycle events at `DEBUG` and
/// failures at `WARN`. Every event carries the key and the observer's label
/// as structured fields.
///
/// ```
/// use lodge_ioc::{Container, LoggingObserver};
/// use std::sync::Arc;
///
/// let container = Container::builder()
///     .observer(Arc::new(LoggingObserver::new()))
///     .build();
/// ```
pub struct LoggingObserver {
    label: &'static str,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self { label: "lodge_ioc" }
    }

    /// Creates an observer whose events carry `label` as the `container` field.
    pub fn with_label(label: &'static str) -> Self {
        Self { label }
    }
}

impl Default for LoggingObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerObserver for LoggingObserver {
    fn resolving(&self, key: &Key) {
        tracing::trace!(container = self.label, key = %key, "resolving");
    }

    fn resolved(&self, key: &Key, duration: Duration) {
        tracing::trace!(container = self.label, key = %key, ?duration, "resolved");
    }

    fn factory_failed(&self, key: &Key, error: &DiError) {
        tracing::warn!(container = self.label, key = %key, %error, "factory failed");
    }

    fn registered(&self, key: &Key, replaced: bool) {
        tracing::debug!(container = self.label, key = %key, replaced, "registered");
    }

    fn decorated(&self, key: &Key) {
        tracing::debug!(container = self.label, key = %key, "decorated");
    }

    fn evaluated(&self, key: &Key, duration: Duration) {
        tracing::debug!(container = self.label, key = %key, ?duration, "instance created");
    }

    fn released(&self, key: &Key) {
        tracing::debug!(container = self.label, key = %key, "released");
    }

    fn release_failed(&self, key: &Key, message: &str) {
        tracing::warn!(container = self.label, key = %key, reason = message, "release failed");
    }
}
