//! Property-based test generators using proptest.
//!
//! Provides strategies for generating keys and documents.

use proptest::prelude::*;
use serde_json::Value;

/// Strategy for generating one legal key segment.
pub fn segment_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9_-][a-zA-Z0-9_.-]{0,11}")
        .expect("Invalid regex")
        .prop_filter("Segment must not contain the reserved sequence", |s| {
            !s.contains("...")
        })
}

/// Strategy for generating valid keys of one to three segments.
pub fn key_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(segment_strategy(), 1..=3).prop_map(|segments| segments.join("/"))
}

/// Strategy for generating keys that must be rejected.
pub fn invalid_key_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        key_strategy().prop_map(|k| format!("/{k}")),
        key_strategy().prop_map(|k| format!("../{k}")),
        key_strategy().prop_map(|k| format!("{k}/../x")),
        key_strategy().prop_map(|k| format!("{k}//x")),
        key_strategy().prop_map(|k| format!("{k}/")),
        key_strategy().prop_map(|k| format!("{k}...lock")),
        key_strategy().prop_map(|k| format!("{k}...tmp.1")),
        key_strategy().prop_map(|k| format!(".filedb/{k}")),
    ]
}

/// Strategy for generating schemaless JSON documents.
pub fn json_doc_strategy() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        "[ -~]{0,16}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedb_storage::Key;

    proptest! {
        #[test]
        fn generated_keys_are_valid(key in key_strategy()) {
            prop_assert!(Key::parse(&key).is_ok(), "rejected {:?}", key);
        }

        #[test]
        fn generated_invalid_keys_are_rejected(key in invalid_key_strategy()) {
            prop_assert!(Key::parse(&key).is_err(), "accepted {:?}", key);
        }
    }
}
