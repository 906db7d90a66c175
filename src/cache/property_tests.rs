//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store's freshness, eviction and key
//! determinism guarantees over generated inputs.

use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

use crate::cache::{create_cache_key, CacheStore};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_DEFAULT_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
/// Generates cache keys
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:]{1,64}".prop_map(|s| s)
}

/// Generates cache values
fn valid_value_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{1,256}".prop_map(|s| s)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: String },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // Freshness: an entry written at t0 with ttl T is returned for every
    // query time in [t0, t0 + T) and absent from t0 + T on.
    #[test]
    fn prop_freshness_window(
        key in valid_key_strategy(),
        value in valid_value_strategy(),
        t0 in 0u64..1_000_000_000,
        ttl_ms in 1u64..10_000_000,
        offset in 0u64..20_000_000,
    ) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);
        store.set_at(key.clone(), value.clone(), Some(Duration::from_millis(ttl_ms)), t0);

        let result = store.get_at(&key, t0 + offset);

        if offset < ttl_ms {
            prop_assert_eq!(result, Some(value));
        } else {
            prop_assert_eq!(result, None);
            prop_assert!(store.get_stale(&key).is_none(), "Expired read should delete");
        }
    }

    // Eviction bound: after inserting max + K entries and one sweep, the
    // store holds at most max entries, and the survivors are the newest.
    #[test]
    fn prop_sweep_enforces_bound(
        max_entries in 1usize..50,
        extra in 1usize..50,
    ) {
        let mut store: CacheStore<usize> = CacheStore::new(max_entries, TEST_DEFAULT_TTL);
        let total = max_entries + extra;

        for i in 0..total {
            store.set(format!("key{i}"), i, None);
        }
        prop_assert_eq!(store.len(), total);

        let report = store.sweep();

        prop_assert!(store.len() <= max_entries);
        prop_assert_eq!(report.evicted, extra);
        for i in extra..total {
            let key = format!("key{i}");
            prop_assert!(store.has(&key), "Newest entry '{}' should survive", key);
        }
    }

    // Key determinism: any permutation of the same parameters yields the
    // same key.
    #[test]
    fn prop_key_ignores_parameter_order(
        prefix in "[a-z:/]{1,20}",
        params in prop::collection::hash_map("[a-z_]{1,8}", "[ -~]{0,16}", 0..8),
        seed in any::<u64>(),
    ) {
        let mut shuffled: Vec<(String, String)> = params.clone().into_iter().collect();
        // Deterministic rotation driven by the seed
        if !shuffled.is_empty() {
            let len = shuffled.len();
            shuffled.rotate_left((seed as usize) % len);
        }
        let mut reversed = shuffled.clone();
        reversed.reverse();

        let a = create_cache_key(&prefix, shuffled);
        let b = create_cache_key(&prefix, reversed);
        let c = create_cache_key(&prefix, &params);

        prop_assert_eq!(&a, &b);
        prop_assert_eq!(&a, &c);
        let expected_prefix = format!("{prefix}:");
        prop_assert!(a.starts_with(&expected_prefix));
    }

    // Statistics: hits and misses match what a model of the operations saw.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);
        let mut model: HashMap<String, String> = HashMap::new();
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    model.insert(key.clone(), value.clone());
                    store.set(key, value, None);
                }
                CacheOp::Get { key } => {
                    let got = store.get(&key);
                    prop_assert_eq!(got.as_ref(), model.get(&key));
                    match got {
                        Some(_) => expected_hits += 1,
                        None => expected_misses += 1,
                    }
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(store.delete(&key), model.remove(&key).is_some());
                }
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits, "Hits mismatch");
        prop_assert_eq!(stats.misses, expected_misses, "Misses mismatch");
        prop_assert_eq!(stats.size, model.len(), "Size mismatch");
    }

    // Overwrite: the last write wins and no duplicate entry appears.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_DEFAULT_TTL);

        store.set(key.clone(), value1, None);
        store.set(key.clone(), value2.clone(), None);

        prop_assert_eq!(store.get(&key), Some(value2));
        prop_assert_eq!(store.len(), 1);
    }
}

// == Property Test for Error Response Format ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Every error maps to a JSON body with a string "error" field.
    #[test]
    fn prop_error_response_format(error_msg in "[a-zA-Z0-9 _-]{1,100}") {
        use crate::error::{ProxyError, UpstreamError};
        use axum::body::to_bytes;
        use axum::response::IntoResponse;

        let error_variants = vec![
            ProxyError::NotFound(error_msg.clone()),
            ProxyError::InvalidRequest(error_msg.clone()),
            ProxyError::Internal(error_msg.clone()),
            ProxyError::Upstream(UpstreamError::InvalidRequest(error_msg.clone())),
            ProxyError::Unavailable { key: "k".to_string(), reason: error_msg.clone() },
        ];

        for error in error_variants {
            let expected_msg = error.to_string();
            let response = error.into_response();

            let content_type = response.headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok());
            prop_assert!(
                content_type.map(|ct| ct.contains("application/json")).unwrap_or(false),
                "Response should have JSON content-type"
            );

            let bytes = tokio_test::block_on(async {
                to_bytes(response.into_body(), usize::MAX).await.unwrap()
            });
            let json: serde_json::Value = serde_json::from_slice(&bytes)
                .expect("Response body should be valid JSON");

            prop_assert_eq!(json["error"].as_str(), Some(expected_msg.as_str()));
        }
    }
}

// == Property Test for Concurrent Operation Correctness ==
proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Concurrent reads, writes and sweeps through the shared lock only ever
    // observe complete values that some writer stored.
    #[test]
    fn prop_concurrent_sweeps_never_corrupt(
        operations in prop::collection::vec(cache_op_strategy(), 10..50)
    ) {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .enable_all()
            .build()
            .unwrap();

        let written: std::collections::HashSet<String> = operations
            .iter()
            .filter_map(|op| match op {
                CacheOp::Set { value, .. } => Some(value.clone()),
                _ => None,
            })
            .collect();

        rt.block_on(async {
            let store = CacheStore::new(5, TEST_DEFAULT_TTL).into_shared();
            let mut handles = vec![];

            for op in operations {
                let store = store.clone();
                handles.push(tokio::spawn(async move {
                    let mut cache = store.write().await;
                    let read = match op {
                        CacheOp::Set { key, value } => {
                            cache.set(key, value, None);
                            None
                        }
                        CacheOp::Get { key } => cache.get(&key),
                        CacheOp::Delete { key } => {
                            cache.delete(&key);
                            None
                        }
                    };
                    cache.sweep();
                    read
                }));
            }

            for handle in handles {
                if let Some(value) = handle.await.expect("Task should not panic") {
                    prop_assert!(written.contains(&value), "Read an unknown value {}", value);
                }
            }

            prop_assert!(store.read().await.len() <= 5);
            Ok(())
        })?;
    }
}
