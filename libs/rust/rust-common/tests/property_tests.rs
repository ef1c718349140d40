//! Property-based tests for rust-common crate.
//!
//! These tests verify universal properties across all inputs using proptest.

use proptest::prelude::*;
use rust_common::{InMemoryStore, KeyValueStore, PlatformError};
use std::time::Duration;

// Property 1: Retryability classification is stable for any message.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_retryable_errors_are_consistent(msg in "[a-zA-Z0-9 ]{1,50}") {
        let retryable = vec![
            PlatformError::unavailable(msg.clone()),
            PlatformError::timeout(msg.clone()),
        ];
        for err in retryable {
            prop_assert!(err.is_retryable(), "Error {:?} should be retryable", err);
        }

        let non_retryable = vec![
            PlatformError::Store(msg.clone()),
            PlatformError::invalid_input(msg.clone()),
            PlatformError::Internal(msg.clone()),
        ];
        for err in non_retryable {
            prop_assert!(!err.is_retryable(), "Error {:?} should not be retryable", err);
        }
    }
}

// Property 2: put_if_absent admits a key exactly once while it is live,
// regardless of how many times it is offered.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_put_if_absent_admits_once(
        keys in prop::collection::vec("[a-f0-9]{8}", 1..20),
        repeats in 1usize..5,
    ) {
        tokio_test::block_on(async {
            let store = InMemoryStore::default();
            let mut admitted = std::collections::HashSet::new();

            for _ in 0..repeats {
                for key in &keys {
                    if store.put_if_absent(key, Duration::from_secs(60)).await.unwrap() {
                        assert!(admitted.insert(key.clone()), "key {key} admitted twice");
                    }
                }
            }

            let distinct: std::collections::HashSet<_> = keys.iter().cloned().collect();
            assert_eq!(admitted, distinct);
        });
    }

    #[test]
    fn prop_exists_after_put(key in "[a-zA-Z0-9:._-]{1,64}") {
        tokio_test::block_on(async {
            let store = InMemoryStore::default();
            store.put_with_ttl(&key, Duration::from_secs(60)).await.unwrap();
            assert!(store.exists(&key).await.unwrap());
        });
    }
}

#[tokio::test]
async fn concurrent_put_if_absent_has_single_winner() {
    let store = InMemoryStore::default();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .put_if_absent("shared-nonce", Duration::from_secs(60))
                .await
                .unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
