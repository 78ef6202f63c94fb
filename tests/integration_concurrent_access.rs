/// Concurrent access integration tests
///
/// These tests verify that the container builds each entry once under
/// contention, hands every thread the same instance, and tracks instances
/// produced on different threads without losing any.

use lodge_ioc::{Container, ContainerObserver, DiError, Dispose, DisposeError, Key};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

const THREADS: usize = 16;

#[derive(Debug)]
struct SlowService {
    created_by: thread::ThreadId,
}

#[test]
fn concurrent_first_resolution_runs_factory_once() {
    let container = Arc::new(Container::new());
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = invocations.clone();

    container
        .register::<SlowService, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(25));
            SlowService { created_by: thread::current().id() }
        })
        .unwrap();

    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let container = container.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                container.resolve::<SlowService>().unwrap()
            })
        })
        .collect();

    let resolved: Vec<Arc<SlowService>> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(invocations.load(Ordering::SeqCst), 1);
    for instance in &resolved[1..] {
        assert!(Arc::ptr_eq(&resolved[0], instance));
        assert_eq!(instance.created_by, resolved[0].created_by);
    }
    assert_eq!(container.tracked_count(), 1);
}

#[test]
fn concurrent_decorated_resolution_runs_each_layer_once() {
    let container = Container::new();
    let factory_calls = Arc::new(AtomicUsize::new(0));
    let decorator_calls = Arc::new(AtomicUsize::new(0));

    let counter = factory_calls.clone();
    container
        .register::<u64, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            1
        })
        .unwrap();
    let counter = decorator_calls.clone();
    container
        .decorate::<u64, _>(move |_, inner| {
            counter.fetch_add(1, Ordering::SeqCst);
            Arc::new(*inner + 1)
        })
        .unwrap();

    let barrier = Barrier::new(THREADS);
    crossbeam_utils::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                barrier.wait();
                assert_eq!(*container.resolve::<u64>().unwrap(), 2);
            });
        }
    })
    .unwrap();

    assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    assert_eq!(decorator_calls.load(Ordering::SeqCst), 1);
    assert_eq!(container.tracked_count(), 2);
}

#[test]
fn waiters_retry_after_a_failed_build() {
    let container = Container::new();
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();

    container
        .try_register::<u32, _, _>(move |_| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(10));
            if attempt == 0 {
                Err("warming up")
            } else {
                Ok(11)
            }
        })
        .unwrap();

    let barrier = Barrier::new(THREADS);
    let failures = AtomicUsize::new(0);
    crossbeam_utils::thread::scope(|s| {
        for _ in 0..THREADS {
            s.spawn(|_| {
                barrier.wait();
                match container.resolve::<u32>() {
                    Ok(value) => assert_eq!(*value, 11),
                    Err(DiError::Factory { .. }) => {
                        failures.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(other) => panic!("unexpected error: {}", other),
                }
            });
        }
    })
    .unwrap();

    // Exactly one caller sees the failed attempt; one retry succeeds.
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert_eq!(*container.resolve::<u32>().unwrap(), 11);
}

macro_rules! services {
    ($($name:ident),*) => {
        $(
            struct $name(Arc<AtomicUsize>);

            impl Dispose for $name {
                fn dispose(&self) -> Result<(), DisposeError> {
                    self.0.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            }
        )*
    };
}

services!(S0, S1, S2, S3, S4, S5, S6, S7);

#[test]
fn concurrent_resolution_of_different_entries_tracks_every_instance() {
    let container = Container::new();
    let released = Arc::new(AtomicUsize::new(0));

    macro_rules! register_all {
        ($($name:ident),*) => {
            $(
                let r = released.clone();
                container.register_disposable::<$name, _>(move |_| $name(r.clone())).unwrap();
            )*
        };
    }
    register_all!(S0, S1, S2, S3, S4, S5, S6, S7);

    let barrier = Barrier::new(8);
    crossbeam_utils::thread::scope(|s| {
        s.spawn(|_| { barrier.wait(); container.resolve::<S0>().unwrap(); });
        s.spawn(|_| { barrier.wait(); container.resolve::<S1>().unwrap(); });
        s.spawn(|_| { barrier.wait(); container.resolve::<S2>().unwrap(); });
        s.spawn(|_| { barrier.wait(); container.resolve::<S3>().unwrap(); });
        s.spawn(|_| { barrier.wait(); container.resolve::<S4>().unwrap(); });
        s.spawn(|_| { barrier.wait(); container.resolve::<S5>().unwrap(); });
        s.spawn(|_| { barrier.wait(); container.resolve::<S6>().unwrap(); });
        s.spawn(|_| { barrier.wait(); container.resolve::<S7>().unwrap(); });
    })
    .unwrap();

    assert_eq!(container.tracked_count(), 8);
    let report = container.dispose();
    assert_eq!(report.released, 8);
    assert_eq!(released.load(Ordering::SeqCst), 8);
}

#[test]
fn registration_and_resolution_of_unrelated_keys_interleave() {
    let container = Container::new();
    container.register::<String, _>(|_| "stable".to_string()).unwrap();

    crossbeam_utils::thread::scope(|s| {
        s.spawn(|_| {
            for i in 0..200u32 {
                container.register_with::<u32, _>(move |_| i, true).unwrap();
            }
        });
        s.spawn(|_| {
            for _ in 0..200 {
                assert_eq!(container.resolve::<String>().unwrap().as_str(), "stable");
            }
        });
    })
    .unwrap();

    assert_eq!(*container.resolve::<u32>().unwrap(), 199);
}

/// Parks the first resolution inside its `resolving` hook until released.
struct ResolveGate {
    armed: AtomicBool,
    entered: Barrier,
    release: Barrier,
}

impl ResolveGate {
    fn new() -> Self {
        Self {
            armed: AtomicBool::new(true),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        }
    }
}

impl ContainerObserver for ResolveGate {
    fn resolving(&self, _key: &Key) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.wait();
            self.release.wait();
        }
    }

    fn resolved(&self, _key: &Key, _duration: Duration) {}

    fn factory_failed(&self, _key: &Key, _error: &DiError) {}
}

#[test]
fn entry_is_locked_once_resolution_has_begun() {
    let gate = Arc::new(ResolveGate::new());
    let container = Container::builder().observer(gate.clone()).build();
    container.register::<u32, _>(|_| 1).unwrap();

    crossbeam_utils::thread::scope(|s| {
        let resolver = s.spawn(|_| container.resolve::<u32>().unwrap());

        gate.entered.wait();
        let registered = container.register::<u32, _>(|_| 2);
        let decorated = container.decorate::<u32, _>(|_, inner| Arc::new(*inner + 100));
        gate.release.wait();

        let first = resolver.join().unwrap();
        let second = container.resolve::<u32>().unwrap();

        assert_eq!(registered, Err(DiError::AlreadyResolved("u32")));
        assert_eq!(decorated, Err(DiError::AlreadyResolved("u32")));
        assert_eq!(*first, 1);
        assert!(Arc::ptr_eq(&first, &second));
    })
    .unwrap();

    assert_eq!(container.tracked_count(), 1);
}
