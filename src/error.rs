//! Error types for the container.

use std::fmt;

use crate::key::Key;

/// Container errors
///
/// Every variant is a synchronous, local failure returned by the call that
/// violated the contract. Type names are carried as `&'static str` (or a
/// `Copy` [`Key`] where the tag matters) so errors stay cheap to clone and
/// compare in tests.
///
/// # Examples
///
/// ```rust
/// use lodge_ioc::{Container, DiError};
///
/// let container = Container::new();
/// match container.resolve::<String>() {
///     Err(DiError::NotRegistered(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiError {
    /// A required argument was absent or empty (names the argument)
    InvalidArgument(&'static str),
    /// No entry exists for the requested key
    NotRegistered(&'static str),
    /// The entry has already been evaluated and can no longer change
    AlreadyResolved(&'static str),
    /// Type downcast failed
    TypeMismatch(&'static str),
    /// Re-entrant resolution detected (includes path)
    Circular(Vec<&'static str>),
    /// Maximum recursion depth exceeded
    DepthExceeded(usize),
    /// A factory panicked while building the entry (type and tag)
    FactoryPanicked(Key),
    /// A fallible factory reported an error
    Factory {
        type_name: &'static str,
        message: String,
    },
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::InvalidArgument(name) => {
                write!(f, "Value cannot be null or empty: {}", name)
            }
            DiError::NotRegistered(name) => write!(f, "No activator registered for '{}'.", name),
            DiError::AlreadyResolved(name) => {
                write!(f, "Type '{}' has already been resolved.", name)
            }
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::DepthExceeded(depth) => write!(f, "Max depth {} exceeded", depth),
            DiError::FactoryPanicked(key) => write!(f, "Factory for '{}' panicked", key),
            DiError::Factory { type_name, message } => {
                write!(f, "Factory for '{}' failed: {}", type_name, message)
            }
        }
    }
}

impl std::error::Error for DiError {}

/// Result type for container operations
pub type DiResult<T> = Result<T, DiError>;

/// Error reported by a [`Dispose`](crate::Dispose) implementation.
pub type DisposeError = Box<dyn std::error::Error + Send + Sync + 'static>;
