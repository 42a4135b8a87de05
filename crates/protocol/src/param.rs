//! Runtime-typed SQL parameters
//!
//! `SqlParam` is the single value type flowing from request decoding into
//! positional statement binding. Binding prefers the driver's binary
//! encoders when the wire type matches the value; for every other pairing
//! the value is rendered in the PostgreSQL text format, which the server
//! parses for any type. Client input therefore never has to be interpolated
//! into SQL text to reach an exotic column type.

use std::collections::HashMap;
use std::error::Error;

use bytes::BytesMut;
use chrono::{DateTime, FixedOffset, SecondsFormat};
use postgres_types::{Format, IsNull, Kind, ToSql, Type};
use rust_decimal::Decimal;

/// One decoded SQL parameter value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Numeric(Decimal),
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Hstore(HashMap<String, Option<String>>),
    BoolArray(Vec<bool>),
    Int2Array(Vec<i16>),
    Int4Array(Vec<i32>),
    Int8Array(Vec<i64>),
    Float4Array(Vec<f32>),
    Float8Array(Vec<f64>),
    NumericArray(Vec<Decimal>),
    TextArray(Vec<String>),
    TimestampArray(Vec<DateTime<FixedOffset>>),
    BytesArray(Vec<Vec<u8>>),
    HstoreArray(Vec<HashMap<String, Option<String>>>),
}

/// Named parameters of one query, in client order
pub type QueryParams = Vec<(String, SqlParam)>;

/// Add `defaults` entries whose keys are absent from `params`
pub fn merge_defaults(params: &mut QueryParams, defaults: &QueryParams) {
    for (key, value) in defaults {
        if !params.iter().any(|(k, _)| k == key) {
            params.push((key.clone(), value.clone()));
        }
    }
}

/// Add `overrides` entries, replacing existing keys
pub fn merge_overwrite(params: &mut QueryParams, overrides: &QueryParams) {
    for (key, value) in overrides {
        match params.iter_mut().find(|(k, _)| k == key) {
            Some((_, slot)) => *slot = value.clone(),
            None => params.push((key.clone(), value.clone())),
        }
    }
}

fn is_text_family(ty: &Type) -> bool {
    *ty == Type::TEXT
        || *ty == Type::VARCHAR
        || *ty == Type::BPCHAR
        || *ty == Type::NAME
        || *ty == Type::UNKNOWN
}

fn render_float(v: f64) -> String {
    if v.is_infinite() {
        let literal = if v > 0.0 { "Infinity" } else { "-Infinity" };
        literal.to_string()
    } else {
        // Display yields the shortest round-tripping decimal; NaN prints as
        // the literal PostgreSQL accepts
        format!("{v}")
    }
}

fn render_bytea(v: &[u8]) -> String {
    let mut out = String::with_capacity(2 + v.len() * 2);
    out.push_str("\\x");
    for b in v {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// Array literal in the text format: `{"a","b",NULL}`
fn render_array_literal<'a>(items: impl Iterator<Item = Option<&'a str>>) -> String {
    let mut out = String::from("{");
    for (i, item) in items.enumerate() {
        if i > 0 {
            out.push(',');
        }
        match item {
            None => out.push_str("NULL"),
            Some(s) => {
                out.push('"');
                for c in s.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            }
        }
    }
    out.push('}');
    out
}

impl SqlParam {
    /// Text rendering for type pairings without a matching binary encoder.
    /// `None` means the value binds binary through the driver.
    fn text_rendering(&self, ty: &Type) -> Option<String> {
        match self {
            SqlParam::Null => None,
            SqlParam::Bool(v) => {
                let literal = if *v { "t" } else { "f" };
                (*ty != Type::BOOL).then(|| literal.to_string())
            }
            SqlParam::Integer(v) => {
                let binary = *ty == Type::INT8
                    || *ty == Type::INT4
                    || *ty == Type::INT2
                    || *ty == Type::OID;
                (!binary).then(|| v.to_string())
            }
            SqlParam::Float(v) => {
                let binary = *ty == Type::FLOAT8 || *ty == Type::FLOAT4;
                (!binary).then(|| render_float(*v))
            }
            SqlParam::Numeric(v) => (*ty != Type::NUMERIC).then(|| v.to_string()),
            SqlParam::Text(v) => (!is_text_family(ty)).then(|| v.clone()),
            SqlParam::Timestamp(v) => {
                let binary = *ty == Type::TIMESTAMPTZ || *ty == Type::TIMESTAMP;
                (!binary).then(|| v.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            SqlParam::Bytes(v) => (*ty != Type::BYTEA).then(|| render_bytea(v)),
            // hstore and typed arrays only ever bind against their own wire
            // type; a text-family member is the one array case introspection
            // cannot promise (uuid[], date[], ... decode to strings)
            SqlParam::TextArray(items) => match ty.kind() {
                Kind::Array(member) if !is_text_family(member) => Some(render_array_literal(
                    items.iter().map(|s| Some(s.as_str())),
                )),
                _ => None,
            },
            _ => None,
        }
    }
}

impl ToSql for SqlParam {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        if let Some(text) = self.text_rendering(ty) {
            out.extend_from_slice(text.as_bytes());
            return Ok(IsNull::No);
        }

        match self {
            SqlParam::Null => Ok(IsNull::Yes),
            SqlParam::Bool(v) => v.to_sql(ty, out),
            SqlParam::Integer(v) => {
                if *ty == Type::INT8 {
                    v.to_sql(ty, out)
                } else if *ty == Type::INT4 {
                    i32::try_from(*v)?.to_sql(ty, out)
                } else if *ty == Type::INT2 {
                    i16::try_from(*v)?.to_sql(ty, out)
                } else {
                    u32::try_from(*v)?.to_sql(ty, out)
                }
            }
            SqlParam::Float(v) => {
                if *ty == Type::FLOAT4 {
                    (*v as f32).to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlParam::Numeric(v) => v.to_sql(ty, out),
            SqlParam::Text(v) => v.to_sql(ty, out),
            SqlParam::Timestamp(v) => {
                if *ty == Type::TIMESTAMP {
                    v.naive_utc().to_sql(ty, out)
                } else {
                    v.to_sql(ty, out)
                }
            }
            SqlParam::Bytes(v) => v.to_sql(ty, out),
            SqlParam::Hstore(v) => v.to_sql(ty, out),
            SqlParam::BoolArray(v) => v.to_sql(ty, out),
            SqlParam::Int2Array(v) => v.to_sql(ty, out),
            SqlParam::Int4Array(v) => v.to_sql(ty, out),
            SqlParam::Int8Array(v) => v.to_sql(ty, out),
            SqlParam::Float4Array(v) => v.to_sql(ty, out),
            SqlParam::Float8Array(v) => v.to_sql(ty, out),
            SqlParam::NumericArray(v) => v.to_sql(ty, out),
            SqlParam::TextArray(v) => v.to_sql(ty, out),
            SqlParam::TimestampArray(v) => match ty.kind() {
                Kind::Array(member) if *member == Type::TIMESTAMP => {
                    let naive: Vec<_> = v.iter().map(|t| t.naive_utc()).collect();
                    naive.to_sql(ty, out)
                }
                _ => v.to_sql(ty, out),
            },
            SqlParam::BytesArray(v) => v.to_sql(ty, out),
            SqlParam::HstoreArray(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // type compatibility is decided per value in to_sql; introspected
        // declared types keep the pairings sane
        true
    }

    fn encode_format(&self, ty: &Type) -> Format {
        if self.text_rendering(ty).is_some() {
            Format::Text
        } else {
            Format::Binary
        }
    }

    fn to_sql_checked(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> std::result::Result<IsNull, Box<dyn Error + Sync + Send>> {
        self.to_sql(ty, out)
    }
}
