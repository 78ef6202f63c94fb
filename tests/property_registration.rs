/// Property-based tests for registration
///
/// These tests use proptest to generate random registration sequences and
/// verify the invariants that hold for all of them.

use lodge_ioc::{Container, DiError};
use proptest::prelude::*;
use std::sync::Arc;

#[derive(Debug)]
struct TestService {
    id: u32,
}

// Property: with overwrite, the last registration before first resolution wins
proptest! {
    #[test]
    fn last_registration_wins(ids in prop::collection::vec(0u32..1000, 1..10)) {
        let container = Container::new();
        for id in ids.clone() {
            let installed = container.register::<TestService, _>(move |_| TestService { id }).unwrap();
            prop_assert!(installed);
        }

        let resolved = container.resolve::<TestService>().unwrap();
        prop_assert_eq!(resolved.id, *ids.last().unwrap());
        prop_assert_eq!(container.len(), 1);
    }
}

// Property: without overwrite, the first registration wins and later ones report false
proptest! {
    #[test]
    fn first_registration_wins_without_overwrite(ids in prop::collection::vec(0u32..1000, 1..10)) {
        let container = Container::new();
        for (index, id) in ids.iter().copied().enumerate() {
            let installed = container
                .register_with::<TestService, _>(move |_| TestService { id }, false)
                .unwrap();
            prop_assert_eq!(installed, index == 0);
        }

        prop_assert_eq!(container.resolve::<TestService>().unwrap().id, ids[0]);
    }
}

// Property: once resolved, every further registration or decoration is rejected
proptest! {
    #[test]
    fn resolved_entries_stay_locked(
        initial in any::<u32>(),
        attempts in prop::collection::vec((any::<u32>(), any::<bool>(), any::<bool>()), 1..8),
    ) {
        let container = Container::new();
        container.register::<TestService, _>(move |_| TestService { id: initial }).unwrap();
        let first = container.resolve::<TestService>().unwrap();

        for (id, overwrite, decorate) in attempts {
            let result = if decorate {
                container.decorate::<TestService, _>(move |_, _| Arc::new(TestService { id }))
            } else {
                container
                    .register_with::<TestService, _>(move |_| TestService { id }, overwrite)
                    .map(|_| ())
            };
            prop_assert_eq!(
                result,
                Err(DiError::AlreadyResolved(std::any::type_name::<TestService>()))
            );
        }

        let again = container.resolve::<TestService>().unwrap();
        prop_assert!(Arc::ptr_eq(&first, &again));
        prop_assert_eq!(again.id, initial);
        prop_assert_eq!(container.tracked_count(), 1);
    }
}

// Property: named entries never collide with each other or with the unnamed entry
proptest! {
    #[test]
    fn named_entries_are_isolated(values in prop::collection::vec(any::<u16>(), 4)) {
        const TAGS: [&str; 3] = ["alpha", "beta", "gamma"];

        let container = Container::new();
        let unnamed = values[3];
        container.register::<u16, _>(move |_| unnamed).unwrap();
        for (tag, value) in TAGS.iter().copied().zip(values.iter().copied()) {
            container.register_named::<u16, _>(tag, move |_| value).unwrap();
        }

        prop_assert_eq!(container.len(), 4);
        prop_assert_eq!(*container.resolve::<u16>().unwrap(), unnamed);
        for (tag, value) in TAGS.iter().copied().zip(values.iter()) {
            prop_assert_eq!(*container.resolve_named::<u16>(tag).unwrap(), *value);
        }
    }
}
