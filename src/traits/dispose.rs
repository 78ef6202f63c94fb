//! Release capability for tracked instances.

use crate::error::DisposeError;

/// Trait for synchronous resource release.
///
/// Implement this for services that need structured teardown (flushing
/// caches, closing connections). Register them with
/// [`Container::register_disposable`](crate::Container::register_disposable)
/// so the container knows the produced instance is releasable; everything
/// else is tracked but skipped during [`Container::dispose`](crate::Container::dispose).
///
/// A returned error is recorded in the [`DisposeReport`](crate::DisposeReport)
/// and does not stop the remaining releases.
///
/// # Examples
///
/// ```
/// use lodge_ioc::{Container, Dispose, DisposeError};
/// use std::sync::atomic::{AtomicBool, Ordering};
///
/// #[derive(Default)]
/// struct Cache {
///     flushed: AtomicBool,
/// }
///
/// impl Dispose for Cache {
///     fn dispose(&self) -> Result<(), DisposeError> {
///         self.flushed.store(true, Ordering::SeqCst);
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.register_disposable::<Cache, _>(|_| Cache::default()).unwrap();
/// let cache = container.resolve::<Cache>().unwrap();
///
/// let report = container.dispose();
/// assert_eq!(report.released, 1);
/// assert!(cache.flushed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Release the resources held by this instance.
    fn dispose(&self) -> Result<(), DisposeError>;
}
