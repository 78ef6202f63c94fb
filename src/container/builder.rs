//! Fluent construction of a configured container.

use std::sync::Arc;

use crate::config::{ContainerOptions, ReleaseOrder};
use crate::observer::{ContainerObserver, Observers};
use crate::Container;

/// Builder for a [`Container`] with custom options and observers.
///
/// ```
/// use lodge_ioc::{Container, LoggingObserver, ReleaseOrder};
/// use std::sync::Arc;
///
/// let container = Container::builder()
///     .release_order(ReleaseOrder::Reverse)
///     .max_depth(64)
///     .observer(Arc::new(LoggingObserver::new()))
///     .build();
///
/// assert_eq!(container.options().max_depth, 64);
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    options: ContainerOptions,
    observers: Observers,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces all options at once.
    pub fn options(mut self, options: ContainerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn detect_cycles(mut self, enabled: bool) -> Self {
        self.options.detect_cycles = enabled;
        self
    }

    /// Sets the nesting ceiling; values below 1 are raised to 1.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.options.max_depth = depth.max(1);
        self
    }

    pub fn release_order(mut self, order: ReleaseOrder) -> Self {
        self.options.release_order = order;
        self
    }

    pub fn dispose_on_drop(mut self, enabled: bool) -> Self {
        self.options.dispose_on_drop = enabled;
        self
    }

    /// Adds an observer. Observers are notified in the order they were added.
    pub fn observer(mut self, observer: Arc<dyn ContainerObserver>) -> Self {
        self.observers.add(observer);
        self
    }

    pub fn build(self) -> Container {
        Container::from_parts(self.options, self.observers)
    }
}
