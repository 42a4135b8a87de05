//! SQL parameter binding tests
//!
//! Exercises the binary-or-text format choice directly against the driver's
//! type constants; no server involved.

use bytes::BytesMut;
use postgres_types::{Format, IsNull, ToSql, Type};

use crate::param::{merge_defaults, merge_overwrite, QueryParams, SqlParam};

fn encode(param: &SqlParam, ty: &Type) -> (Format, Vec<u8>, bool) {
    let mut buf = BytesMut::new();
    let is_null = matches!(param.to_sql(ty, &mut buf).unwrap(), IsNull::Yes);
    (param.encode_format(ty), buf.to_vec(), is_null)
}

#[test]
fn integers_narrow_to_the_wire_type() {
    let (format, bytes, _) = encode(&SqlParam::Integer(7), &Type::INT8);
    assert!(matches!(format, Format::Binary));
    assert_eq!(bytes, 7i64.to_be_bytes());

    let (format, bytes, _) = encode(&SqlParam::Integer(7), &Type::INT2);
    assert!(matches!(format, Format::Binary));
    assert_eq!(bytes, 7i16.to_be_bytes());

    let mut buf = BytesMut::new();
    assert!(SqlParam::Integer(70000).to_sql(&Type::INT2, &mut buf).is_err());
}

#[test]
fn integer_against_numeric_column_falls_back_to_text() {
    let (format, bytes, _) = encode(&SqlParam::Integer(42), &Type::NUMERIC);
    assert!(matches!(format, Format::Text));
    assert_eq!(bytes, b"42");
}

#[test]
fn text_against_exotic_type_stays_textual() {
    let (format, bytes, _) = encode(&SqlParam::Text("2024-01-01".to_string()), &Type::DATE);
    assert!(matches!(format, Format::Text));
    assert_eq!(bytes, b"2024-01-01");

    // a text column binds binary
    let (format, bytes, _) = encode(&SqlParam::Text("abc".to_string()), &Type::TEXT);
    assert!(matches!(format, Format::Binary));
    assert_eq!(bytes, b"abc");
}

#[test]
fn null_is_null_for_any_type() {
    let (_, bytes, is_null) = encode(&SqlParam::Null, &Type::INT4);
    assert!(is_null);
    assert!(bytes.is_empty());
}

#[test]
fn bool_text_fallback_uses_postgres_literals() {
    let (format, bytes, _) = encode(&SqlParam::Bool(true), &Type::TEXT);
    assert!(matches!(format, Format::Text));
    assert_eq!(bytes, b"t");
}

#[test]
fn text_array_renders_literal_for_non_text_members() {
    let param = SqlParam::TextArray(vec!["a\"b".to_string(), "c".to_string()]);
    let (format, bytes, _) = encode(&param, &Type::UUID_ARRAY);
    assert!(matches!(format, Format::Text));
    assert_eq!(bytes, br#"{"a\"b","c"}"#);

    // against text[] the driver's binary array encoding is used
    assert!(matches!(param.encode_format(&Type::TEXT_ARRAY), Format::Binary));
}

#[test]
fn float_text_fallback_spells_infinity() {
    let (format, bytes, _) = encode(&SqlParam::Float(f64::INFINITY), &Type::NUMERIC);
    assert!(matches!(format, Format::Text));
    assert_eq!(bytes, b"Infinity");
}

#[test]
fn merge_defaults_keeps_existing_keys() {
    let mut params: QueryParams = vec![("a".to_string(), SqlParam::Integer(1))];
    let defaults: QueryParams = vec![
        ("a".to_string(), SqlParam::Integer(9)),
        ("b".to_string(), SqlParam::Integer(2)),
    ];
    merge_defaults(&mut params, &defaults);
    assert_eq!(
        params,
        vec![
            ("a".to_string(), SqlParam::Integer(1)),
            ("b".to_string(), SqlParam::Integer(2)),
        ]
    );
}

#[test]
fn merge_overwrite_replaces_existing_keys() {
    let mut params: QueryParams = vec![("a".to_string(), SqlParam::Integer(1))];
    let overrides: QueryParams = vec![("a".to_string(), SqlParam::Integer(9))];
    merge_overwrite(&mut params, &overrides);
    assert_eq!(params, vec![("a".to_string(), SqlParam::Integer(9))]);
}
