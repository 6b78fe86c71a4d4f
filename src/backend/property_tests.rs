//! Property-Based Tests for the Backend and Coders
//!
//! Uses proptest to check the storage and coder properties.

use proptest::prelude::*;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

use crate::backend::{Backend, ClearScope, InMemoryBackend};
use crate::coder::{BinaryCoder, Coder, JsonCoder, StringCoder};

// == Test Configuration ==
const TEST_EXPIRE: u64 = 300;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// == Strategies ==
/// Generates key suffixes
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}".prop_map(|s| s)
}

/// Generates arbitrary byte values
fn valid_value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Generates nested JSON values
fn json_value_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::from),
        "\\PC{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("\\PC{1,6}", inner, 0..4)
                .prop_map(|m: BTreeMap<String, Value>| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Repeated reads inside the TTL window return the stored bytes unchanged.
    #[test]
    fn prop_idempotent_hit(key in valid_key_strategy(), value in valid_value_strategy()) {
        let rt = runtime();
        let backend = InMemoryBackend::new();

        rt.block_on(backend.set(&key, value.clone(), Some(TEST_EXPIRE))).unwrap();

        for _ in 0..3 {
            let retrieved = rt.block_on(backend.get(&key)).unwrap();
            prop_assert_eq!(retrieved, Some(value.clone()), "Repeated read mismatch");
        }
    }

    // Storing V1 then V2 under one key leaves V2 and a single entry.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        value1 in valid_value_strategy(),
        value2 in valid_value_strategy()
    ) {
        let rt = runtime();
        let backend = InMemoryBackend::new();

        rt.block_on(backend.set(&key, value1, Some(TEST_EXPIRE))).unwrap();
        rt.block_on(backend.set(&key, value2.clone(), Some(TEST_EXPIRE))).unwrap();

        prop_assert_eq!(rt.block_on(backend.get(&key)).unwrap(), Some(value2));
        prop_assert_eq!(rt.block_on(backend.len()), 1);
    }

    // A namespace clear removes exactly the keys under that prefix.
    #[test]
    fn prop_namespace_clear_isolation(
        ns1_keys in prop::collection::vec(valid_key_strategy(), 1..10),
        ns2_keys in prop::collection::vec(valid_key_strategy(), 1..10)
    ) {
        let rt = runtime();
        let backend = InMemoryBackend::new();

        let ns1: HashSet<String> = ns1_keys.iter().map(|k| format!("ns1:{}", k)).collect();
        let ns2: HashSet<String> = ns2_keys.iter().map(|k| format!("ns2:{}", k)).collect();

        for key in ns1.iter().chain(ns2.iter()) {
            rt.block_on(backend.set(key, key.as_bytes().to_vec(), Some(TEST_EXPIRE))).unwrap();
        }

        let removed = rt
            .block_on(backend.clear(ClearScope::Namespace("ns1".to_string())))
            .unwrap();
        prop_assert_eq!(removed, ns1.len());

        for key in &ns1 {
            prop_assert_eq!(rt.block_on(backend.get(key)).unwrap(), None);
        }
        for key in &ns2 {
            prop_assert_eq!(
                rt.block_on(backend.get(key)).unwrap(),
                Some(key.as_bytes().to_vec())
            );
        }
    }

    // decode(encode(v)) == v for the JSON coder.
    #[test]
    fn prop_json_coder_roundtrip(value in json_value_strategy()) {
        let encoded = JsonCoder.encode(&value).unwrap();
        prop_assert_eq!(JsonCoder.decode(&encoded).unwrap(), value);
    }

    // decode(encode(v)) == v for the binary coder.
    #[test]
    fn prop_binary_coder_roundtrip(value in json_value_strategy()) {
        let encoded = BinaryCoder.encode(&value).unwrap();
        prop_assert_eq!(BinaryCoder.decode(&encoded).unwrap(), value);
    }

    // Finite floats survive the JSON coder bit for bit.
    #[test]
    fn prop_json_coder_float_bits(bits in any::<u64>()) {
        let original = f64::from_bits(bits);
        prop_assume!(original.is_finite());

        let encoded = JsonCoder.encode(&Value::from(original)).unwrap();
        let decoded = JsonCoder.decode(&encoded).unwrap();
        prop_assert_eq!(decoded.as_f64().map(f64::to_bits), Some(bits));
    }

    // decode(encode(s)) == s for the string coder on text values.
    #[test]
    fn prop_string_coder_roundtrip(text in "\\PC{0,64}") {
        let value = Value::String(text);
        let encoded = StringCoder.encode(&value).unwrap();
        prop_assert_eq!(StringCoder.decode(&encoded).unwrap(), value);
    }
}
