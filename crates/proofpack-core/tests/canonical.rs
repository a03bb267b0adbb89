// crates/proofpack-core/tests/canonical.rs
// ============================================================================
// Module: Canonicalization Tests
// Description: Tests for canonical JSON, paths, line endings, and hashing.
// ============================================================================
//! ## Overview
//! Validates that semantically identical content yields identical bytes and
//! digests, and that malformed hashes and unsafe paths are rejected.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use proofpack_core::HashDigest;
use proofpack_core::canonical::canonical_text_bytes;
use proofpack_core::canonical::sorted_entries;
use proofpack_core::canonical::validate_path_segment;
use proofpack_core::canonical_json_bytes;
use proofpack_core::canonical_path;
use proofpack_core::canonical_text;
use proofpack_core::canonicalize;
use proofpack_core::hash_bytes;
use proofpack_core::hash_canonical_json;
use proofpack_core::hash_canonical_text;
use proofpack_core::hash_str;
use proofpack_core::validate_relative_path;
use proptest::prelude::*;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Canonical JSON
// ============================================================================

/// Tests nested keys are sorted at every level.
#[test]
fn test_canonicalize_sorts_nested_keys() {
    let value = json!({"z": {"b": 2, "a": 1}, "a": 1});
    let bytes = canonicalize(&value).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"a":1,"z":{"a":1,"b":2}}"#);
}

/// Tests arrays keep their order and output is compact.
#[test]
fn test_canonicalize_preserves_array_order() {
    let value = json!({"list": [3, 1, 2], "s": "a b"});
    let bytes = canonicalize(&value).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"list":[3,1,2],"s":"a b"}"#);
}

/// Tests key order in the input does not affect the digest.
#[test]
fn test_canonical_json_hash_is_stable() {
    let value_a = json!({"b": 1, "a": 2, "c": {"y": null, "x": [true, false]}});
    let value_b = json!({"c": {"x": [true, false], "y": null}, "a": 2, "b": 1});
    assert_eq!(hash_canonical_json(&value_a).unwrap(), hash_canonical_json(&value_b).unwrap());
}

/// Tests the explicit sort step orders by key bytes.
#[test]
fn test_sorted_entries_orders_by_key_bytes() {
    let value = json!({"b": 1, "B": 2, "a": 3, "aa": 4});
    let Value::Object(map) = value else {
        panic!("expected object");
    };
    let keys: Vec<&str> = sorted_entries(&map).into_iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["B", "a", "aa", "b"]);
}

/// Tests string escaping follows JSON rules.
#[test]
fn test_canonicalize_escapes_strings() {
    let value = json!({"k": "line\n\"quoted\""});
    let bytes = canonicalize(&value).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"k":"line\n\"quoted\""}"#);
}

/// Tests equal numbers produce the same bytes and digest.
#[test]
fn test_canonical_hash_normalizes_numeric_representation() {
    let hash_a = hash_canonical_json(&json!(1.0)).unwrap();
    let hash_b = hash_canonical_json(&json!(1)).unwrap();
    assert_eq!(hash_a, hash_b);

    let float: Value = serde_json::from_str(r#"{"score":1.0,"scale":100.0,"ratio":0.5}"#).unwrap();
    let bytes = canonicalize(&float).unwrap();
    assert_eq!(String::from_utf8(bytes).unwrap(), r#"{"ratio":0.5,"scale":100,"score":1}"#);
}

/// Tests typed values canonicalize like their JSON form.
#[test]
fn test_canonical_json_bytes_matches_value_form() {
    #[derive(serde::Serialize)]
    struct Sample {
        zeta: u32,
        alpha: &'static str,
    }
    let typed = canonical_json_bytes(&Sample {
        zeta: 7,
        alpha: "x",
    })
    .unwrap();
    let untyped = canonicalize(&json!({"alpha": "x", "zeta": 7})).unwrap();
    assert_eq!(typed, untyped);
}

// ============================================================================
// SECTION: Canonical Paths and Text
// ============================================================================

/// Tests backslashes become forward slashes.
#[test]
fn test_canonical_path_rewrites_separators() {
    assert_eq!(canonical_path("plan\\outline.json"), "plan/outline.json");
    assert_eq!(canonical_path("a/b\\c"), "a/b/c");
    assert_eq!(canonical_path("already/fine"), "already/fine");
}

/// Tests CRLF and lone CR normalize to LF and the transform is idempotent.
#[test]
fn test_canonical_text_normalizes_line_endings() {
    assert_eq!(canonical_text("a\r\nb\rc\n"), "a\nb\nc\n");
    let once = canonical_text("x\r\n\r\ny\r");
    assert_eq!(canonical_text(&once), once);
    assert_eq!(canonical_text_bytes(b"x\r\n\r\ny\r"), once.as_bytes());
}

/// Tests LF and CRLF forms hash identically after canonicalization.
#[test]
fn test_line_ending_hash_equivalence() {
    let lf = "first line\nsecond line\n";
    let crlf = "first line\r\nsecond line\r\n";
    assert_ne!(hash_str(lf), hash_str(crlf));
    assert_eq!(hash_canonical_text(lf), hash_canonical_text(crlf));
    assert_eq!(hash_str(&canonical_text(crlf)), hash_str(lf));
}

/// Tests unsafe relative paths are rejected.
#[test]
fn test_validate_relative_path_rejects_unsafe_paths() {
    let rejected =
        ["", "/etc/passwd", "\\root", "C:\\x", "c:/x", "a/../b", "..", "./a", "a//b", "a\0b"];
    for path in rejected {
        assert!(validate_relative_path(path).is_err(), "expected rejection for {path:?}");
    }
    for path in ["a", "plan/outline.json", "plan\\outline.json", "a.b/c-d_e"] {
        assert!(validate_relative_path(path).is_ok(), "expected acceptance for {path:?}");
    }
}

/// Tests segments may not contain separators.
#[test]
fn test_validate_path_segment_rejects_separators() {
    assert!(validate_path_segment("plan").is_ok());
    assert!(validate_path_segment("plan/x").is_err());
    assert!(validate_path_segment("plan\\x").is_err());
    assert!(validate_path_segment("..").is_err());
}

// ============================================================================
// SECTION: Hash Values
// ============================================================================

/// Tests digests are 64 lowercase hex characters.
#[test]
fn test_hash_bytes_shape() {
    let digest = hash_bytes(b"proof");
    assert_eq!(digest.as_str().len(), 64);
    assert!(digest.as_str().bytes().all(|byte| matches!(byte, b'0' ..= b'9' | b'a' ..= b'f')));
}

/// Tests malformed hashes fail to parse and to deserialize.
#[test]
fn test_malformed_hash_is_rejected() {
    let valid = hash_str("x").to_string();
    assert!(HashDigest::parse(&valid).is_ok());
    assert!(HashDigest::parse(&valid.to_uppercase()).is_err());
    assert!(HashDigest::parse(&valid[.. 63]).is_err());
    assert!(HashDigest::parse(&format!("{}g", &valid[.. 63])).is_err());
    assert!(serde_json::from_value::<HashDigest>(json!("abc")).is_err());
    let round: HashDigest = serde_json::from_value(json!(valid)).unwrap();
    assert_eq!(round.as_str(), valid);
}

/// Tests the known SHA-256 digest of the empty-tree seed.
#[test]
fn test_hash_str_matches_sha256() {
    assert_eq!(
        hash_str("").as_str(),
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
    );
}

// ============================================================================
// SECTION: Properties
// ============================================================================

fn json_document<N>(number: N) -> impl Strategy<Value = Value>
where
    N: Strategy<Value = Value> + 'static,
{
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        number,
        "[a-zA-Z0-9 ]{0,12}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Value::Array),
            prop::collection::btree_map("[a-zA-Z]{1,6}", inner, 0 .. 4)
                .prop_map(|map| Value::Object(map.into_iter().collect())),
        ]
    })
}

fn json_value() -> impl Strategy<Value = Value> {
    json_document((-1_000_000i64 .. 1_000_000).prop_map(|number| json!(number)))
}

fn json_value_with_floats() -> impl Strategy<Value = Value> {
    json_document(prop_oneof![
        Just(json!(1.0)),
        Just(json!(1e21)),
        Just(json!(0.1)),
        Just(json!(-0.0)),
        (-1.0e9f64 .. 1.0e9).prop_map(|number| json!(number)),
        (-1_000_000i64 .. 1_000_000).prop_map(|number| json!(number)),
    ])
}

proptest! {
    #[test]
    fn canonical_bytes_round_trip_to_the_same_value(value in json_value()) {
        let bytes = canonicalize(&value).unwrap();
        let parsed: Value = serde_json::from_slice(&bytes).unwrap();
        prop_assert_eq!(&parsed, &value);
        prop_assert_eq!(canonicalize(&parsed).unwrap(), bytes);
    }

    #[test]
    fn canonical_bytes_match_rfc8785_for_ascii_documents(value in json_value_with_floats()) {
        let ours = canonicalize(&value).unwrap();
        let jcs = serde_jcs::to_vec(&value).unwrap();
        prop_assert_eq!(ours, jcs);
    }

    #[test]
    fn canonical_text_is_idempotent(text in "[a-z\r\n]{0,32}") {
        let once = canonical_text(&text);
        prop_assert!(!once.contains('\r'));
        prop_assert_eq!(canonical_text(&once), once.clone());
    }
}
