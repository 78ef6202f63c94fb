//! # lodge-ioc
//!
//! A minimal, thread-safe inversion-of-control container.
//!
//! ## Features
//!
//! - **Lazy singletons**: each registered factory runs at most once, on first resolution
//! - **Race-free first access**: concurrent resolvers block until the single build finishes
//! - **Decoration**: wrap a registered factory before it is first resolved
//! - **Resolved entries are locked**: no re-registration or decoration after evaluation
//! - **Tracked teardown**: every produced instance is released by `dispose()`
//! - **Re-entrancy detection**: a factory that needs itself fails with a cycle path
//!
//! ## Quick Start
//!
//! ```rust
//! use lodge_ioc::Container;
//! use std::sync::Arc;
//!
//! struct Config {
//!     url: String,
//! }
//!
//! struct Repository {
//!     config: Arc<Config>,
//! }
//!
//! let container = Container::new();
//! container.register::<Config, _>(|_| Config { url: "postgres://localhost".into() })?;
//! container.register::<Repository, _>(|c| Repository {
//!     config: c.resolve::<Config>().expect("config is registered"),
//! })?;
//!
//! let a = container.resolve::<Repository>()?;
//! let b = container.resolve::<Repository>()?;
//! assert!(Arc::ptr_eq(&a, &b));
//! assert_eq!(a.config.url, "postgres://localhost");
//! # Ok::<(), lodge_ioc::DiError>(())
//! ```
//!
//! ## Decoration
//!
//! ```rust
//! use lodge_ioc::{Container, DiError};
//! use std::sync::Arc;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Plain;
//! impl Greeter for Plain {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! struct Shouting(Arc<dyn Greeter>);
//! impl Greeter for Shouting {
//!     fn greet(&self) -> String {
//!         self.0.greet().to_uppercase()
//!     }
//! }
//!
//! let container = Container::new();
//! container.register::<Arc<dyn Greeter>, _>(|_| Arc::new(Plain) as Arc<dyn Greeter>)?;
//! container.decorate::<Arc<dyn Greeter>, _>(|_, inner| {
//!     Arc::new(Arc::new(Shouting((*inner).clone())) as Arc<dyn Greeter>)
//! })?;
//!
//! assert_eq!(container.resolve::<Arc<dyn Greeter>>()?.greet(), "HELLO");
//!
//! // Resolved entries are locked.
//! let err = container.decorate::<Arc<dyn Greeter>, _>(|_, inner| inner).unwrap_err();
//! assert!(matches!(err, DiError::AlreadyResolved(_)));
//! # Ok::<(), DiError>(())
//! ```

use std::any::Any;
use std::sync::Arc;

pub mod config;
pub mod container;
pub mod error;
pub mod key;
pub mod observer;
pub mod traits;

mod activator;
mod internal;

/// Type-erased shared instance as stored by the container.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

pub use config::{ContainerOptions, ReleaseOrder, DEFAULT_MAX_DEPTH};
pub use container::{AnyDecorator, AnyFactory, Container, ContainerBuilder, DisposeReport, ReleaseFailure};
pub use error::{DiError, DiResult, DisposeError};
pub use key::{key_of_named, key_of_type, Key};
pub use observer::{ContainerObserver, LoggingObserver};
pub use traits::Dispose;
