//! The container: registration, decoration and resolution.
//!
//! A [`Container`] maps a [`Key`] to an activator that builds its instance
//! at most once, on first resolution. Entries can be replaced or decorated
//! until that first resolution begins; after that they are locked.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::activator::{Activator, Ctor};
use crate::config::ContainerOptions;
use crate::internal::{release_fn, ReleaseFn, TrackedInstances};
use crate::key::{key_of_named, key_of_type, Key};
use crate::observer::Observers;
use crate::traits::Dispose;
use crate::{AnyArc, DiError, DiResult};

mod builder;
mod teardown;

pub use builder::ContainerBuilder;
pub use teardown::{DisposeReport, ReleaseFailure};

#[cfg(feature = "ahash")]
type KeyHasher = ahash::RandomState;
#[cfg(not(feature = "ahash"))]
type KeyHasher = std::collections::hash_map::RandomState;

/// Type-erased factory accepted by [`Container::register_any`].
pub type AnyFactory = Arc<dyn Fn(&Container) -> DiResult<AnyArc> + Send + Sync>;

/// Type-erased decorator accepted by [`Container::decorate_any`]. Receives
/// the inner instance and returns its replacement.
pub type AnyDecorator = Arc<dyn Fn(&Container, AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// Inversion-of-control container with lazily built, cached instances.
///
/// The container is `Send + Sync`; share it between threads behind an `Arc`.
/// Factories receive the container itself so they can resolve their own
/// dependencies.
///
/// # Examples
///
/// ```
/// use lodge_ioc::Container;
/// use std::sync::Arc;
///
/// struct Database {
///     url: String,
/// }
///
/// struct UserService {
///     db: Arc<Database>,
/// }
///
/// let container = Container::new();
/// container.register::<Database, _>(|_| Database { url: "postgres://localhost".into() })?;
/// container.register::<UserService, _>(|c| UserService {
///     db: c.resolve::<Database>().expect("database is registered"),
/// })?;
///
/// let users = container.resolve::<UserService>()?;
/// assert_eq!(users.db.url, "postgres://localhost");
/// assert!(Arc::ptr_eq(&users.db, &container.resolve::<Database>()?));
/// # Ok::<(), lodge_ioc::DiError>(())
/// ```
pub struct Container {
    registry: DashMap<Key, Arc<Activator>, KeyHasher>,
    tracked: TrackedInstances,
    observers: Observers,
    options: ContainerOptions,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("entries", &self.registry.len())
            .field("tracked", &self.tracked.len())
            .field("observers", &self.observers.len())
            .field("options", &self.options)
            .finish()
    }
}

impl Container {
    /// Creates an empty container with default options.
    pub fn new() -> Self {
        Self::with_options(ContainerOptions::default())
    }

    /// Creates an empty container. A `max_depth` of 0 is raised to 1.
    pub fn with_options(options: ContainerOptions) -> Self {
        Self::from_parts(options, Observers::default())
    }

    /// Starts a [`ContainerBuilder`] for options and observers.
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_parts(mut options: ContainerOptions, observers: Observers) -> Self {
        options.max_depth = options.max_depth.max(1);
        Self {
            registry: DashMap::with_hasher(KeyHasher::default()),
            tracked: TrackedInstances::default(),
            observers,
            options,
        }
    }

    pub fn options(&self) -> &ContainerOptions {
        &self.options
    }

    pub(crate) fn observers(&self) -> &Observers {
        &self.observers
    }

    pub(crate) fn tracked(&self) -> &TrackedInstances {
        &self.tracked
    }

    // ----- Registration -----

    /// Registers a factory for `T`, replacing any unevaluated entry.
    ///
    /// Returns `Ok(true)` when the factory was installed. Fails with
    /// [`DiError::AlreadyResolved`] once `T` has been resolved.
    pub fn register<T, F>(&self, factory: F) -> DiResult<bool>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.register_with::<T, F>(factory, true)
    }

    /// Registers a factory for `T`.
    ///
    /// With `overwrite_existing == false` an existing unevaluated entry is
    /// kept and `Ok(false)` is returned.
    ///
    /// ```
    /// use lodge_ioc::Container;
    ///
    /// let container = Container::new();
    /// assert!(container.register_with::<u32, _>(|_| 1, false)?);
    /// assert!(!container.register_with::<u32, _>(|_| 2, false)?);
    /// assert_eq!(*container.resolve::<u32>()?, 1);
    /// # Ok::<(), lodge_ioc::DiError>(())
    /// ```
    pub fn register_with<T, F>(&self, factory: F, overwrite_existing: bool) -> DiResult<bool>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.install(key_of_type::<T>(), erase(factory), None, overwrite_existing)
    }

    /// Registers a factory under `T` plus an explicit tag.
    ///
    /// An empty tag fails with [`DiError::InvalidArgument`].
    pub fn register_named<T, F>(&self, tag: &'static str, factory: F) -> DiResult<bool>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.install(key_of_named::<T>(tag), erase(factory), None, true)
    }

    /// Registers a factory whose instances are released by [`Container::dispose`].
    pub fn register_disposable<T, F>(&self, factory: F) -> DiResult<bool>
    where
        T: Dispose,
        F: Fn(&Container) -> T + Send + Sync + 'static,
    {
        self.install(key_of_type::<T>(), erase(factory), Some(release_fn::<T>()), true)
    }

    /// Registers a fallible factory.
    ///
    /// An `Err` from the factory is returned from `resolve` as
    /// [`DiError::Factory`] and leaves the entry unevaluated, so a later
    /// resolution runs the factory again.
    ///
    /// ```
    /// use lodge_ioc::{Container, DiError};
    ///
    /// let container = Container::new();
    /// container.try_register::<u16, _, _>(|_| "80x".parse::<u16>())?;
    ///
    /// assert!(matches!(container.resolve::<u16>(), Err(DiError::Factory { .. })));
    /// assert!(!container.is_resolved::<u16>());
    /// # Ok::<(), DiError>(())
    /// ```
    pub fn try_register<T, F, E>(&self, factory: F) -> DiResult<bool>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container) -> Result<T, E> + Send + Sync + 'static,
        E: fmt::Display,
    {
        let type_name = std::any::type_name::<T>();
        let ctor: Ctor = Arc::new(move |container: &Container| -> DiResult<AnyArc> {
            match factory(container) {
                Ok(value) => Ok(Arc::new(value) as AnyArc),
                Err(error) => Err(DiError::Factory {
                    type_name,
                    message: error.to_string(),
                }),
            }
        });
        self.install(key_of_type::<T>(), ctor, None, true)
    }

    /// Registers an already-built value. It is tracked on first resolution
    /// like any factory output.
    pub fn register_instance<T>(&self, value: T) -> DiResult<bool>
    where
        T: Send + Sync + 'static,
    {
        let value: AnyArc = Arc::new(value);
        let ctor: Ctor = Arc::new(move |_: &Container| -> DiResult<AnyArc> { Ok(value.clone()) });
        self.install(key_of_type::<T>(), ctor, None, true)
    }

    /// Type-erased registration.
    ///
    /// `None` as the factory fails with [`DiError::InvalidArgument`]. The
    /// factory must produce a value of the key's type, otherwise typed
    /// resolution reports [`DiError::TypeMismatch`].
    pub fn register_any(
        &self,
        key: Key,
        factory: Option<AnyFactory>,
        overwrite_existing: bool,
    ) -> DiResult<bool> {
        let factory = factory.ok_or(DiError::InvalidArgument("factory"))?;
        self.install(key, factory, None, overwrite_existing)
    }

    fn install(
        &self,
        key: Key,
        ctor: Ctor,
        release: Option<ReleaseFn>,
        overwrite_existing: bool,
    ) -> DiResult<bool> {
        validate_key(&key)?;
        let activator = Arc::new(Activator::new(key, ctor, release));

        let (installed, replaced) = match self.registry.entry(key) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_locked() {
                    return Err(DiError::AlreadyResolved(key.display_name()));
                }
                if overwrite_existing {
                    entry.insert(activator);
                    (true, true)
                } else {
                    (false, false)
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(activator);
                (true, false)
            }
        };

        if installed {
            tracing::debug!(key = %key, replaced, "factory registered");
            self.observers.registered(&key, replaced);
        }
        Ok(installed)
    }

    // ----- Decoration -----

    /// Wraps the registered, not yet resolved factory for `T`.
    ///
    /// On first resolution the inner factory runs, then `decorator` receives
    /// its instance and returns the one callers will see. Both instances are
    /// tracked. Decorating again wraps the previous decorator.
    ///
    /// ```
    /// use lodge_ioc::Container;
    /// use std::sync::Arc;
    ///
    /// let container = Container::new();
    /// container.register::<String, _>(|_| "core".to_string())?;
    /// container.decorate::<String, _>(|_, inner| Arc::new(format!("logged({})", inner)))?;
    /// container.decorate::<String, _>(|_, inner| Arc::new(format!("timed({})", inner)))?;
    ///
    /// assert_eq!(container.resolve::<String>()?.as_str(), "timed(logged(core))");
    /// # Ok::<(), lodge_ioc::DiError>(())
    /// ```
    pub fn decorate<T, F>(&self, decorator: F) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, Arc<T>) -> Arc<T> + Send + Sync + 'static,
    {
        self.install_decorator(key_of_type::<T>(), erase_decorator(decorator), None)
    }

    /// Wraps the registered factory for `T` under `tag`.
    pub fn decorate_named<T, F>(&self, tag: &'static str, decorator: F) -> DiResult<()>
    where
        T: Send + Sync + 'static,
        F: Fn(&Container, Arc<T>) -> Arc<T> + Send + Sync + 'static,
    {
        self.install_decorator(key_of_named::<T>(tag), erase_decorator(decorator), None)
    }

    /// Like [`decorate`](Self::decorate), marking the decorated instance as
    /// releasable on teardown.
    pub fn decorate_disposable<T, F>(&self, decorator: F) -> DiResult<()>
    where
        T: Dispose,
        F: Fn(&Container, Arc<T>) -> Arc<T> + Send + Sync + 'static,
    {
        self.install_decorator(
            key_of_type::<T>(),
            erase_decorator(decorator),
            Some(release_fn::<T>()),
        )
    }

    /// Type-erased decoration. `None` fails with [`DiError::InvalidArgument`].
    pub fn decorate_any(&self, key: Key, decorator: Option<AnyDecorator>) -> DiResult<()> {
        let decorator = decorator.ok_or(DiError::InvalidArgument("factory"))?;
        self.install_decorator(key, decorator, None)
    }

    fn install_decorator(
        &self,
        key: Key,
        decorator: AnyDecorator,
        release: Option<ReleaseFn>,
    ) -> DiResult<()> {
        validate_key(&key)?;

        match self.registry.entry(key) {
            Entry::Vacant(_) => return Err(DiError::NotRegistered(key.display_name())),
            Entry::Occupied(mut entry) => {
                if entry.get().is_locked() {
                    return Err(DiError::AlreadyResolved(key.display_name()));
                }
                let inner = Arc::clone(entry.get());
                let ctor: Ctor = Arc::new(move |container: &Container| -> DiResult<AnyArc> {
                    let original = inner.evaluate(container, None)?;
                    decorator(container, original)
                });
                entry.insert(Arc::new(Activator::new(key, ctor, release)));
            }
        }

        tracing::debug!(key = %key, "decorator installed");
        self.observers.decorated(&key);
        Ok(())
    }

    // ----- Resolution -----

    /// Resolves `T`, building it on first use.
    ///
    /// Fails with [`DiError::NotRegistered`] when nothing is registered for
    /// `T`, and propagates factory failures.
    pub fn resolve<T>(&self) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.resolve_typed(&key_of_type::<T>())
    }

    pub fn resolve_named<T>(&self, tag: &'static str) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.resolve_typed(&key_of_named::<T>(tag))
    }

    /// Resolves `T` if registered.
    ///
    /// An absent entry is `Ok(None)`, never an error. Failures of a
    /// registered entry's factory chain are still returned as `Err`.
    ///
    /// ```
    /// use lodge_ioc::Container;
    ///
    /// let container = Container::new();
    /// assert!(container.try_resolve::<u8>()?.is_none());
    ///
    /// container.register::<u8, _>(|_| 3)?;
    /// assert_eq!(container.try_resolve::<u8>()?.as_deref(), Some(&3));
    /// # Ok::<(), lodge_ioc::DiError>(())
    /// ```
    pub fn try_resolve<T>(&self) -> DiResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        self.try_resolve_typed(&key_of_type::<T>())
    }

    pub fn try_resolve_named<T>(&self, tag: &'static str) -> DiResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        self.try_resolve_typed(&key_of_named::<T>(tag))
    }

    /// Type-erased resolution.
    pub fn resolve_any(&self, key: &Key) -> DiResult<AnyArc> {
        self.try_resolve_any(key)?
            .ok_or(DiError::NotRegistered(key.display_name()))
    }

    /// Type-erased resolution that reports absence as `Ok(None)`.
    pub fn try_resolve_any(&self, key: &Key) -> DiResult<Option<AnyArc>> {
        let entry = match self.registry.get(key) {
            Some(entry) => entry,
            None => return Ok(None),
        };
        let activator = Arc::clone(entry.value());
        // Claim before releasing the shard so the entry cannot be swapped
        // out from under this resolution.
        let claim = activator.claim();
        drop(entry);

        if !self.observers.has_observers() {
            return activator.evaluate(self, claim).map(Some);
        }

        let started = Instant::now();
        self.observers.resolving(key);
        let value = activator.evaluate(self, claim)?;
        self.observers.resolved(key, started.elapsed());
        Ok(Some(value))
    }

    fn resolve_typed<T>(&self, key: &Key) -> DiResult<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        downcast(self.resolve_any(key)?, key)
    }

    fn try_resolve_typed<T>(&self, key: &Key) -> DiResult<Option<Arc<T>>>
    where
        T: Send + Sync + 'static,
    {
        self.try_resolve_any(key)?
            .map(|value| downcast(value, key))
            .transpose()
    }

    // ----- Introspection -----

    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_key(&key_of_type::<T>())
    }

    pub fn contains_key(&self, key: &Key) -> bool {
        self.registry.contains_key(key)
    }

    /// True once `T`'s instance has been built.
    pub fn is_resolved<T: 'static>(&self) -> bool {
        self.is_resolved_key(&key_of_type::<T>())
    }

    pub fn is_resolved_key(&self, key: &Key) -> bool {
        self.registry
            .get(key)
            .map(|entry| entry.value().is_evaluated())
            .unwrap_or(false)
    }

    /// Number of registry entries.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Number of instances produced and not yet handed to [`dispose`](Self::dispose).
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Snapshot of the registered keys, in no particular order.
    pub fn keys(&self) -> Vec<Key> {
        self.registry.iter().map(|entry| *entry.key()).collect()
    }

    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        let mut lines: Vec<String> = self
            .registry
            .iter()
            .map(|entry| {
                let state = if entry.value().is_evaluated() { "resolved" } else { "pending" };
                format!("  {}: {}", entry.value().key(), state)
            })
            .collect();
        lines.sort();

        let mut s = String::from("=== Container Debug ===\n");
        s.push_str(&format!("Entries: {}\n", lines.len()));
        for line in lines {
            s.push_str(&line);
            s.push('\n');
        }
        s.push_str(&format!("Tracked instances: {}\n", self.tracked.len()));
        s
    }
}

fn validate_key(key: &Key) -> DiResult<()> {
    match key.tag() {
        Some(tag) if tag.trim().is_empty() => Err(DiError::InvalidArgument("tag")),
        _ => Ok(()),
    }
}

fn erase<T, F>(factory: F) -> Ctor
where
    T: Send + Sync + 'static,
    F: Fn(&Container) -> T + Send + Sync + 'static,
{
    Arc::new(move |container: &Container| -> DiResult<AnyArc> {
        Ok(Arc::new(factory(container)) as AnyArc)
    })
}

fn erase_decorator<T, F>(decorator: F) -> AnyDecorator
where
    T: Send + Sync + 'static,
    F: Fn(&Container, Arc<T>) -> Arc<T> + Send + Sync + 'static,
{
    let type_name = std::any::type_name::<T>();
    Arc::new(move |container: &Container, original: AnyArc| -> DiResult<AnyArc> {
        let original = original
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(type_name))?;
        Ok(decorator(container, original) as AnyArc)
    })
}

fn downcast<T>(value: AnyArc, key: &Key) -> DiResult<Arc<T>>
where
    T: Send + Sync + 'static,
{
    value
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(key.display_name()))
}
