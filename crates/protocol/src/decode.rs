//! Client value decoding
//!
//! Three entry points, one per transport position: URL path segments, form
//! fields, and JSON body values. Dispatch is keyed by the parameter's
//! declared type; anything unrecognized passes through as text and is parsed
//! by the server itself.

use std::collections::HashMap;

use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use base64::Engine;
use chrono::{DateTime, FixedOffset};
use percent_encoding::percent_decode_str;
use rust_decimal::Decimal;
use serde_json::Value as Json;

use crate::error::{ProtocolError, Result};
use crate::param::SqlParam;
use crate::types::ParameterType;

/// Decode a raw URL path segment under the declared type.
///
/// Empty segments decode to null for every non-text type, mirroring the
/// query-string convention of omitting a value.
pub fn decode_path_value(raw: &str, ty: &ParameterType) -> Result<SqlParam> {
    let param = match ty.name.as_str() {
        "boolean" => match raw {
            "" => SqlParam::Null,
            "t" | "true" => SqlParam::Bool(true),
            "f" | "false" => SqlParam::Bool(false),
            other => {
                return Err(ProtocolError::invalid_value(
                    &ty.name,
                    format!("invalid boolean value: {other}"),
                ))
            }
        },
        "smallint" | "integer" | "bigint" => match raw {
            "" => SqlParam::Null,
            _ => SqlParam::Integer(
                raw.parse::<i64>()
                    .map_err(|e| ProtocolError::invalid_value(&ty.name, e.to_string()))?,
            ),
        },
        "real" | "double precision" => match raw {
            "" => SqlParam::Null,
            _ => SqlParam::Float(
                raw.parse::<f64>()
                    .map_err(|e| ProtocolError::invalid_value(&ty.name, e.to_string()))?,
            ),
        },
        "timestamp without time zone" | "timestamp with time zone" => match raw {
            "" => SqlParam::Null,
            _ => SqlParam::Timestamp(parse_timestamp(raw, &ty.name)?),
        },
        "bytea" => SqlParam::Bytes(
            URL_SAFE
                .decode(raw)
                .map_err(|e| ProtocolError::invalid_value(&ty.name, e.to_string()))?,
        ),
        // including numeric, money, date, times, character types, and any
        // user-defined type: the server parses the text form
        _ => SqlParam::Text(unescape(raw, &ty.name)?),
    };

    Ok(param)
}

/// Decode a form field under the declared type.
///
/// Form values are already percent-decoded by the query parser; they pass
/// through as text for the server to interpret.
pub fn decode_form_value(value: &str, _ty: &ParameterType) -> SqlParam {
    SqlParam::Text(value.to_string())
}

/// Decode a JSON value under the declared type
pub fn decode_json_value(value: &Json, ty: &ParameterType) -> Result<SqlParam> {
    if value.is_null() {
        return Ok(SqlParam::Null);
    }

    let param = match ty.name.as_str() {
        "boolean" => SqlParam::Bool(as_bool(value, ty)?),
        "boolean[]" => SqlParam::BoolArray(elements(value, ty, as_bool)?),
        "smallint" | "integer" | "bigint" => SqlParam::Integer(as_i64(value, ty)?),
        "smallint[]" => SqlParam::Int2Array(elements(value, ty, |v, t| {
            i16::try_from(as_i64(v, t)?)
                .map_err(|_| ProtocolError::invalid_value(&t.name, "value out of range"))
        })?),
        "integer[]" => SqlParam::Int4Array(elements(value, ty, |v, t| {
            i32::try_from(as_i64(v, t)?)
                .map_err(|_| ProtocolError::invalid_value(&t.name, "value out of range"))
        })?),
        "bigint[]" => SqlParam::Int8Array(elements(value, ty, as_i64)?),
        "real" | "double precision" => SqlParam::Float(as_f64(value, ty)?),
        "real[]" => SqlParam::Float4Array(elements(value, ty, |v, t| {
            Ok(as_f64(v, t)? as f32)
        })?),
        "double precision[]" => SqlParam::Float8Array(elements(value, ty, as_f64)?),
        "numeric" | "money" => SqlParam::Numeric(as_numeric(value, ty)?),
        "numeric[]" | "money[]" => SqlParam::NumericArray(elements(value, ty, as_numeric)?),
        "timestamp without time zone" | "timestamp with time zone" => {
            SqlParam::Timestamp(parse_timestamp(as_str(value, ty)?, &ty.name)?)
        }
        "timestamp without time zone[]" | "timestamp with time zone[]" => {
            SqlParam::TimestampArray(elements(value, ty, |v, t| {
                parse_timestamp(as_str(v, t)?, &t.name)
            })?)
        }
        "bytea" => SqlParam::Bytes(as_bytea(value, ty)?),
        "bytea[]" => SqlParam::BytesArray(elements(value, ty, as_bytea)?),
        "hstore" => SqlParam::Hstore(as_hstore(value, ty)?),
        "hstore[]" => SqlParam::HstoreArray(elements(value, ty, as_hstore)?),
        name if name.ends_with("[]") => {
            // character[], uuid[], date[], time[], and friends: elements
            // travel as text and the server casts per the column type
            SqlParam::TextArray(elements(value, ty, |v, t| {
                Ok(as_str(v, t)?.to_string())
            })?)
        }
        // character, text, uuid, date, times, and unknown types: strings
        // pass through, structured JSON is re-serialized as JSON text
        _ => SqlParam::Text(fallback_text(value)),
    };

    Ok(param)
}

fn as_bool(value: &Json, ty: &ParameterType) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| ProtocolError::invalid_value(&ty.name, "JSON boolean expected"))
}

fn as_i64(value: &Json, ty: &ParameterType) -> Result<i64> {
    value
        .as_i64()
        .ok_or_else(|| ProtocolError::invalid_value(&ty.name, "JSON integer expected"))
}

fn as_f64(value: &Json, ty: &ParameterType) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| ProtocolError::invalid_value(&ty.name, "JSON number expected"))
}

fn as_str<'a>(value: &'a Json, ty: &ParameterType) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| ProtocolError::invalid_value(&ty.name, "JSON string expected"))
}

/// Exact decimal from a JSON number or string: integers bind directly,
/// anything fractional must come as a string to avoid binary-float loss
fn as_numeric(value: &Json, ty: &ParameterType) -> Result<Decimal> {
    if let Some(n) = value.as_i64() {
        return Ok(Decimal::from(n));
    }
    if value.is_number() {
        return Err(ProtocolError::invalid_value(
            &ty.name,
            "fractional numerics must be passed as strings",
        ));
    }
    as_str(value, ty)?
        .parse::<Decimal>()
        .map_err(|e| ProtocolError::invalid_value(&ty.name, e.to_string()))
}

fn as_bytea(value: &Json, ty: &ParameterType) -> Result<Vec<u8>> {
    STANDARD
        .decode(as_str(value, ty)?)
        .map_err(|e| ProtocolError::invalid_value(&ty.name, e.to_string()))
}

fn as_hstore(value: &Json, ty: &ParameterType) -> Result<HashMap<String, Option<String>>> {
    let object = value
        .as_object()
        .ok_or_else(|| ProtocolError::invalid_value(&ty.name, "JSON object expected"))?;

    let mut map = HashMap::with_capacity(object.len());
    for (key, item) in object {
        let entry = match item {
            Json::Null => None,
            Json::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        map.insert(key.clone(), entry);
    }
    Ok(map)
}

fn elements<T>(
    value: &Json,
    ty: &ParameterType,
    convert: impl Fn(&Json, &ParameterType) -> Result<T>,
) -> Result<Vec<T>> {
    let items = value
        .as_array()
        .ok_or_else(|| ProtocolError::invalid_value(&ty.name, "JSON array expected"))?;
    items.iter().map(|item| convert(item, ty)).collect()
}

fn fallback_text(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn parse_timestamp(raw: &str, type_name: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(raw)
        .map_err(|e| ProtocolError::invalid_value(type_name, e.to_string()))
}

fn unescape(raw: &str, type_name: &str) -> Result<String> {
    let spaced = raw.replace('+', " ");
    percent_decode_str(&spaced)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| ProtocolError::invalid_value(type_name, e.to_string()))
}
