//! Capability traits recognised by the container.

mod dispose;

pub use dispose::Dispose;
