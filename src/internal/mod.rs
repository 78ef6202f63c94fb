//! Internal implementation details.

use std::any::Any;

pub(crate) mod circular;
pub(crate) mod tracked;

pub(crate) use circular::{cycle_path, StackGuard};
pub(crate) use tracked::{release_fn, ReleaseFn, TrackedInstance, TrackedInstances};

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
