//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the in-memory backend against a plain map and to
//! check that derived keys are always addressable.

use proptest::prelude::*;
use std::collections::HashMap;

use crate::cache::{validate_key, KeyDeriver, MemoryStore, MAX_VALUE_SIZE};

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;

// == Strategies ==
/// Generates keys shaped like derived request paths
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-z]{1,8}(\\.[a-z0-9_-]{1,8}){0,3}"
}

/// Generates opaque values
fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..128)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Vec<u8> },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (valid_key_strategy(), value_strategy())
            .prop_map(|(key, value)| CacheOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| CacheOp::Get { key }),
        valid_key_strategy().prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Below capacity the store behaves exactly like a map
    #[test]
    fn prop_store_matches_map(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let mut store = MemoryStore::new(TEST_MAX_ENTRIES, MAX_VALUE_SIZE);
        let mut model: HashMap<String, Vec<u8>> = HashMap::new();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    store.set(&key, value.clone()).unwrap();
                    model.insert(key, value);
                }
                CacheOp::Get { key } => {
                    prop_assert_eq!(store.get(&key).unwrap(), model.get(&key).cloned());
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(store.delete(&key).unwrap(), model.remove(&key).is_some());
                }
            }
        }

        prop_assert_eq!(store.len(), model.len());
    }

    // After a delete the key is absent, whether or not it existed
    #[test]
    fn prop_delete_leaves_key_absent(
        key in valid_key_strategy(),
        value in value_strategy(),
        populate in any::<bool>()
    ) {
        let mut store = MemoryStore::new(TEST_MAX_ENTRIES, MAX_VALUE_SIZE);
        if populate {
            store.set(&key, value).unwrap();
        }

        let existed = store.delete(&key).unwrap();
        prop_assert_eq!(existed, populate);
        prop_assert_eq!(store.get(&key).unwrap(), None);
    }

    // The number of entries never exceeds the configured capacity
    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), value_strategy()), 1..200)
    ) {
        let max_entries = 50;
        let mut store = MemoryStore::new(max_entries, MAX_VALUE_SIZE);

        for (key, value) in entries {
            store.set(&key, value).unwrap();
            prop_assert!(
                store.len() <= max_entries,
                "Store size {} exceeds max {}",
                store.len(),
                max_entries
            );
        }
    }

    // Non-root request paths always derive a key the backend accepts
    #[test]
    fn prop_derived_keys_are_valid(path in "(/[a-zA-Z0-9_.~%-]{1,16}){1,8}") {
        let key = KeyDeriver::default().derive(&path);
        prop_assert!(validate_key(&key).is_ok(), "key {:?} rejected", key);
    }
}
