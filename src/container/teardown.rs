//! Bulk release of tracked instances.

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::ReleaseOrder;
use crate::internal::{panic_message, TrackedInstance};
use crate::key::Key;
use crate::Container;

/// Outcome of [`Container::dispose`].
#[derive(Debug, Default, Clone)]
pub struct DisposeReport {
    /// Instances whose `dispose` completed without error.
    pub released: usize,
    /// Tracked instances without a release hook, or seen twice.
    pub skipped: usize,
    pub failures: Vec<ReleaseFailure>,
}

impl DisposeReport {
    /// True when no release failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A release that returned an error or panicked.
#[derive(Debug, Clone)]
pub struct ReleaseFailure {
    pub key: Key,
    pub message: String,
}

impl Container {
    /// Releases every tracked instance, then clears the registry.
    ///
    /// The tracked list is taken before any release runs, so a second call
    /// (or a concurrent one) never releases the same instance again. The
    /// same `Arc` tracked twice, e.g. a decorator that returns its input, is
    /// released once. Errors and panics from individual releases are
    /// collected in the report and logged; the remaining releases still run.
    ///
    /// ```
    /// use lodge_ioc::{Container, Dispose, DisposeError};
    ///
    /// struct Broken;
    /// impl Dispose for Broken {
    ///     fn dispose(&self) -> Result<(), DisposeError> {
    ///         Err("socket already closed".into())
    ///     }
    /// }
    ///
    /// let container = Container::new();
    /// container.register_disposable::<Broken, _>(|_| Broken).unwrap();
    /// container.register::<u8, _>(|_| 1).unwrap();
    /// container.resolve::<Broken>().unwrap();
    /// container.resolve::<u8>().unwrap();
    ///
    /// let report = container.dispose();
    /// assert_eq!(report.released, 0);
    /// assert_eq!(report.skipped, 1);
    /// assert_eq!(report.failures[0].message, "socket already closed");
    /// assert!(container.is_empty());
    ///
    /// assert_eq!(container.dispose().failures.len(), 0);
    /// ```
    pub fn dispose(&self) -> DisposeReport {
        let mut entries = self.tracked().take();
        if self.options().release_order == ReleaseOrder::Reverse {
            entries.reverse();
        }

        let mut report = DisposeReport::default();
        let mut seen: HashSet<*const ()> = HashSet::with_capacity(entries.len());

        for TrackedInstance { key, instance, release } in entries {
            let release = match release {
                Some(release) => release,
                None => {
                    report.skipped += 1;
                    continue;
                }
            };
            if !seen.insert(Arc::as_ptr(&instance) as *const ()) {
                report.skipped += 1;
                continue;
            }

            match panic::catch_unwind(AssertUnwindSafe(|| release(&instance))) {
                Ok(Ok(())) => {
                    report.released += 1;
                    self.observers().released(&key);
                }
                Ok(Err(error)) => self.record_failure(&mut report, key, error.to_string()),
                Err(payload) => {
                    let message = format!("release panicked: {}", panic_message(payload.as_ref()));
                    self.record_failure(&mut report, key, message);
                }
            }
        }

        self.registry.clear();
        tracing::debug!(
            released = report.released,
            skipped = report.skipped,
            failed = report.failures.len(),
            "container disposed"
        );
        report
    }

    fn record_failure(&self, report: &mut DisposeReport, key: Key, message: String) {
        tracing::warn!(key = %key, error = %message, "release failed");
        self.observers().release_failed(&key, &message);
        report.failures.push(ReleaseFailure { key, message });
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if !self.tracked().has_releasable() {
            return;
        }
        if self.options().dispose_on_drop {
            let report = self.dispose();
            if !report.is_clean() {
                tracing::warn!(
                    failed = report.failures.len(),
                    "releases failed while dropping container"
                );
            }
        } else {
            tracing::warn!("container dropped with undisposed instances; call dispose() before dropping");
        }
    }
}
