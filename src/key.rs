//! Type identity keys for the registry.

use std::any::TypeId;
use std::fmt;

/// Key for entry storage and lookup.
///
/// A key is the type identity an entry is registered under. Unnamed keys are
/// derived from the Rust type alone; named keys add a caller-chosen tag so
/// several entries of the same type can coexist. Tags are compared verbatim:
/// resolving with a different tag than the one registered is a caller bug,
/// reported as [`DiError::NotRegistered`](crate::DiError::NotRegistered).
///
/// # Examples
///
/// ```rust
/// use lodge_ioc::{key_of_named, key_of_type, Key};
///
/// let port = key_of_named::<u16>("port");
/// assert_eq!(port.display_name(), "u16");
/// assert_eq!(port.tag(), Some("port"));
///
/// assert_ne!(key_of_type::<u16>(), port);
/// assert!(matches!(key_of_type::<u16>(), Key::Type(_, "u16")));
/// ```
#[derive(Debug, Clone, Copy)]
pub enum Key {
    /// Concrete type key with TypeId and name for diagnostics
    Type(TypeId, &'static str),
    /// Named type key with TypeId, type name, and tag
    Named(TypeId, &'static str, &'static str),
}

impl Key {
    /// Get the type name for display
    ///
    /// This is the `std::any::type_name` result captured at key creation.
    pub fn display_name(&self) -> &'static str {
        match self {
            Key::Type(_, name) => name,
            Key::Named(_, name, _) => name,
        }
    }

    /// Get the tag for named keys, or `None` for unnamed ones
    pub fn tag(&self) -> Option<&'static str> {
        match self {
            Key::Type(_, _) => None,
            Key::Named(_, _, tag) => Some(tag),
        }
    }

    /// The underlying `TypeId`
    pub fn type_id(&self) -> TypeId {
        match self {
            Key::Type(id, _) | Key::Named(id, _, _) => *id,
        }
    }
}

// Names are diagnostics only; identity is the TypeId (and tag).
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Key::Type(a, _), Key::Type(b, _)) => a == b,
            (Key::Named(a, _, tag_a), Key::Named(b, _, tag_b)) => a == b && tag_a == tag_b,
            _ => false,
        }
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            Key::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            Key::Named(id, _, tag) => {
                1u8.hash(state);
                id.hash(state);
                tag.hash(state);
            }
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Type(_, name) => f.write_str(name),
            Key::Named(_, name, tag) => write!(f, "{}[{}]", name, tag),
        }
    }
}

#[inline(always)]
pub fn key_of_type<T: 'static>() -> Key {
    Key::Type(TypeId::of::<T>(), std::any::type_name::<T>())
}

#[inline(always)]
pub fn key_of_named<T: 'static>(tag: &'static str) -> Key {
    Key::Named(TypeId::of::<T>(), std::any::type_name::<T>(), tag)
}
