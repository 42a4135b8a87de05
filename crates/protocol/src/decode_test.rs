//! Client value decoding tests

use rust_decimal::Decimal;
use serde_json::json;

use crate::decode::{decode_json_value, decode_path_value};
use crate::param::SqlParam;
use crate::types::ParameterType;

fn ty(name: &str) -> ParameterType {
    ParameterType::scalar(name)
}

#[test]
fn path_boolean_forms() {
    assert_eq!(
        decode_path_value("t", &ty("boolean")).unwrap(),
        SqlParam::Bool(true)
    );
    assert_eq!(
        decode_path_value("false", &ty("boolean")).unwrap(),
        SqlParam::Bool(false)
    );
    assert_eq!(
        decode_path_value("", &ty("boolean")).unwrap(),
        SqlParam::Null
    );
    assert!(decode_path_value("yes", &ty("boolean")).is_err());
}

#[test]
fn path_integer_and_empty() {
    assert_eq!(
        decode_path_value("42", &ty("bigint")).unwrap(),
        SqlParam::Integer(42)
    );
    assert_eq!(decode_path_value("", &ty("integer")).unwrap(), SqlParam::Null);
    assert!(decode_path_value("4.5", &ty("integer")).is_err());
}

#[test]
fn path_bytea_uses_url_safe_base64() {
    assert_eq!(
        decode_path_value("_-4=", &ty("bytea")).unwrap(),
        SqlParam::Bytes(vec![0xff, 0xee])
    );
}

#[test]
fn path_text_unescapes() {
    assert_eq!(
        decode_path_value("a%20b+c", &ty("text")).unwrap(),
        SqlParam::Text("a b c".to_string())
    );
}

#[test]
fn json_null_wins_over_type() {
    assert_eq!(
        decode_json_value(&json!(null), &ty("integer")).unwrap(),
        SqlParam::Null
    );
}

#[test]
fn json_integer_family_rejects_floats() {
    assert_eq!(
        decode_json_value(&json!(7), &ty("smallint")).unwrap(),
        SqlParam::Integer(7)
    );
    assert!(decode_json_value(&json!(7.5), &ty("integer")).is_err());
}

#[test]
fn json_integer_arrays_narrow() {
    assert_eq!(
        decode_json_value(&json!([1, 2]), &ty("smallint[]")).unwrap(),
        SqlParam::Int2Array(vec![1, 2])
    );
    assert!(decode_json_value(&json!([70000]), &ty("smallint[]")).is_err());
    assert_eq!(
        decode_json_value(&json!([1, 2]), &ty("integer[]")).unwrap(),
        SqlParam::Int4Array(vec![1, 2])
    );
}

#[test]
fn json_numeric_integer_then_string() {
    assert_eq!(
        decode_json_value(&json!(10), &ty("numeric")).unwrap(),
        SqlParam::Numeric(Decimal::from(10))
    );
    assert_eq!(
        decode_json_value(&json!("12.50"), &ty("numeric")).unwrap(),
        SqlParam::Numeric("12.50".parse().unwrap())
    );
    // fractional JSON numbers would round-trip through a float
    assert!(decode_json_value(&json!(12.5), &ty("numeric")).is_err());
}

#[test]
fn json_timestamp_rfc3339() {
    let param = decode_json_value(&json!("2024-01-02T03:04:05Z"), &ty("timestamp with time zone"))
        .unwrap();
    match param {
        SqlParam::Timestamp(dt) => assert_eq!(dt.timestamp(), 1704164645),
        other => panic!("expected timestamp, got {other:?}"),
    }
}

#[test]
fn json_bytea_uses_standard_base64() {
    assert_eq!(
        decode_json_value(&json!("/+4="), &ty("bytea")).unwrap(),
        SqlParam::Bytes(vec![0xff, 0xee])
    );
}

#[test]
fn json_hstore_serializes_non_string_values() {
    let param = decode_json_value(
        &json!({"a": "x", "b": null, "c": {"n": 1}}),
        &ty("hstore"),
    )
    .unwrap();
    match param {
        SqlParam::Hstore(map) => {
            assert_eq!(map.get("a").unwrap().as_deref(), Some("x"));
            assert_eq!(map.get("b").unwrap(), &None);
            assert_eq!(map.get("c").unwrap().as_deref(), Some("{\"n\":1}"));
        }
        other => panic!("expected hstore, got {other:?}"),
    }
}

#[test]
fn json_unknown_type_passes_structures_through_as_text() {
    assert_eq!(
        decode_json_value(&json!("plain"), &ty("citext")).unwrap(),
        SqlParam::Text("plain".to_string())
    );
    assert_eq!(
        decode_json_value(&json!({"k": [1, 2]}), &ty("jsonb")).unwrap(),
        SqlParam::Text("{\"k\":[1,2]}".to_string())
    );
}

#[test]
fn json_unknown_array_type_travels_as_text_elements() {
    assert_eq!(
        decode_json_value(&json!(["a", "b"]), &ty("uuid[]")).unwrap(),
        SqlParam::TextArray(vec!["a".to_string(), "b".to_string()])
    );
}
