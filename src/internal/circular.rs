//! Thread-local resolution stack for cycle paths and depth limiting.

use std::cell::RefCell;

use crate::error::{DiError, DiResult};

thread_local! {
    static RESOLUTION_TLS: RefCell<ResolutionTls> = RefCell::new(ResolutionTls::default());
}

#[derive(Default)]
struct ResolutionTls {
    stack: Vec<&'static str>,
}

/// Guard for one frame of the thread-local resolution stack.
///
/// Pushed when an activator starts running its factory on this thread and
/// popped on drop, including during unwinding.
pub(crate) struct StackGuard {
    name: &'static str,
}

impl StackGuard {
    pub(crate) fn enter(name: &'static str, max_depth: usize) -> DiResult<Self> {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            if tls.stack.len() >= max_depth {
                return Err(DiError::DepthExceeded(tls.stack.len()));
            }
            tls.stack.push(name);
            Ok(Self { name })
        })
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        RESOLUTION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            if let Some(last) = tls.stack.pop() {
                debug_assert_eq!(last, self.name);
            }
        });
    }
}

/// Builds the cycle path for a re-entrant request of `name` on this thread.
///
/// The path starts at the first frame for `name` and ends with `name` again.
/// Without a recorded frame the path is just the two ends.
pub(crate) fn cycle_path(name: &'static str) -> Vec<&'static str> {
    RESOLUTION_TLS.with(|tls| {
        let tls = tls.borrow();
        let mut path = match tls.stack.iter().position(|&n| n == name) {
            Some(start) => tls.stack[start..].to_vec(),
            None => vec![name],
        };
        path.push(name);
        path
    })
}

#[cfg(test)]
pub(crate) fn depth() -> usize {
    RESOLUTION_TLS.with(|tls| tls.borrow().stack.len())
}
