//! Row decoding into the visitor event stream
//!
//! A `RecordSetReader` frames one statement's rows; `decode_column` picks a
//! typed decoder by the column's type OID and emits the corresponding
//! events. Arrays must have rank zero or one; the driver rejects anything
//! higher while decoding, which surfaces here as a protocol error.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use postgres_types::{FromSql, Type};
use tokio_postgres::Row;
use uuid::Uuid;

use crate::error::{ProtocolError, Result};
use crate::visitor::RecordSetVisitor;
use crate::wire::{PgInet, PgMoney, PgNumeric, RawJson};

/// Streams the rows of one statement into a visitor
pub struct RecordSetReader {
    columns: Vec<String>,
    single_row: bool,
}

impl RecordSetReader {
    /// Frame a full record set; `single_row` skips the record-set events for
    /// composite-returning procedure calls that yield exactly one row.
    pub fn new(columns: Vec<String>, single_row: bool) -> Self {
        Self {
            columns,
            single_row,
        }
    }

    /// Column names captured from the prepared statement
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Emit the record-set opening unless in single-row mode
    pub fn begin(&self, visitor: &mut dyn RecordSetVisitor) -> Result<()> {
        if self.single_row {
            Ok(())
        } else {
            visitor.begin_record_set(&self.columns)
        }
    }

    /// Emit one row
    pub fn row(&self, visitor: &mut dyn RecordSetVisitor, row: &Row) -> Result<()> {
        visitor.begin_record(&self.columns)?;
        for idx in 0..row.len() {
            visitor.begin_column(&self.columns[idx])?;
            decode_column(visitor, row, idx)?;
            visitor.end_column()?;
        }
        visitor.end_record()
    }

    /// Close the record set
    pub fn finish(&self, visitor: &mut dyn RecordSetVisitor) -> Result<()> {
        if self.single_row {
            Ok(())
        } else {
            visitor.end_record_set()
        }
    }

    /// Emit the first column of `row` as a bare scalar, with no record or
    /// column framing. Used for scalar-returning procedure calls.
    pub fn scalar(&self, visitor: &mut dyn RecordSetVisitor, row: &Row) -> Result<()> {
        decode_column(visitor, row, 0)
    }
}

/// Synthesize the single-row record set reporting rows affected by a
/// DELETE or UPDATE
pub fn visit_rows_affected(visitor: &mut dyn RecordSetVisitor, rows_affected: u64) -> Result<()> {
    let columns = vec!["RowsAffected".to_string()];
    visitor.begin_record_set(&columns)?;
    visitor.begin_record(&columns)?;
    visitor.begin_column(&columns[0])?;
    visitor.integer(rows_affected as i64)?;
    visitor.end_column()?;
    visitor.end_record()?;
    visitor.end_record_set()
}

fn decode_column(v: &mut dyn RecordSetVisitor, row: &Row, idx: usize) -> Result<()> {
    let ty = row.columns()[idx].type_().clone();

    if ty == Type::BOOL {
        return match row.try_get::<_, Option<bool>>(idx)? {
            Some(x) => v.boolean(x),
            None => v.null(),
        };
    }
    if ty == Type::INT2 {
        return emit_opt(v, row.try_get::<_, Option<i16>>(idx)?, |v, x| {
            v.integer(i64::from(x))
        });
    }
    if ty == Type::INT4 {
        return emit_opt(v, row.try_get::<_, Option<i32>>(idx)?, |v, x| {
            v.integer(i64::from(x))
        });
    }
    if ty == Type::INT8 {
        return emit_opt(v, row.try_get::<_, Option<i64>>(idx)?, |v, x| v.integer(x));
    }
    if ty == Type::OID {
        return emit_opt(v, row.try_get::<_, Option<u32>>(idx)?, |v, x| {
            v.integer(i64::from(x))
        });
    }
    if ty == Type::FLOAT4 {
        return emit_opt(v, row.try_get::<_, Option<f32>>(idx)?, |v, x| {
            v.float(f64::from(x))
        });
    }
    if ty == Type::FLOAT8 {
        return emit_opt(v, row.try_get::<_, Option<f64>>(idx)?, |v, x| v.float(x));
    }
    if ty == Type::NUMERIC {
        return emit_opt(v, row.try_get::<_, Option<PgNumeric>>(idx)?, |v, x| {
            v.numeric(&x.0)
        });
    }
    if ty == Type::MONEY {
        return emit_opt(v, row.try_get::<_, Option<PgMoney>>(idx)?, |v, x| {
            v.numeric(&x.to_decimal_string())
        });
    }
    if ty == Type::DATE {
        return emit_opt(v, row.try_get::<_, Option<NaiveDate>>(idx)?, |v, x| {
            v.date(x)
        });
    }
    if ty == Type::TIMESTAMP {
        return emit_opt(v, row.try_get::<_, Option<NaiveDateTime>>(idx)?, |v, x| {
            v.datetime(DateTime::<Utc>::from_naive_utc_and_offset(x, Utc))
        });
    }
    if ty == Type::TIMESTAMPTZ {
        return emit_opt(v, row.try_get::<_, Option<DateTime<Utc>>>(idx)?, |v, x| {
            v.datetime(x)
        });
    }
    if ty == Type::TEXT || ty == Type::VARCHAR || ty == Type::BPCHAR || ty == Type::NAME {
        return emit_opt(v, row.try_get::<_, Option<String>>(idx)?, |v, x| {
            v.string(&x)
        });
    }
    if ty == Type::UUID {
        return emit_opt(v, row.try_get::<_, Option<Uuid>>(idx)?, |v, x| {
            v.string(&x.to_string())
        });
    }
    if ty == Type::JSON || ty == Type::JSONB {
        return emit_opt(v, row.try_get::<_, Option<RawJson>>(idx)?, |v, x| v.json(&x.0));
    }
    if ty == Type::BYTEA {
        return emit_opt(v, row.try_get::<_, Option<Vec<u8>>>(idx)?, |v, x| {
            v.bytes(&x)
        });
    }
    if ty == Type::INET || ty == Type::CIDR {
        return emit_opt(v, row.try_get::<_, Option<PgInet>>(idx)?, |v, x| {
            v.string(&x.0)
        });
    }
    if ty.name() == "hstore" {
        return match row.try_get::<_, Option<std::collections::HashMap<String, Option<String>>>>(
            idx,
        )? {
            None => v.null(),
            Some(map) => {
                v.begin_object()?;
                for (key, value) in map {
                    v.string(&key)?;
                    match value {
                        Some(s) => v.string(&s)?,
                        None => v.null()?,
                    }
                }
                v.end_object()
            }
        };
    }

    if ty == Type::BOOL_ARRAY {
        return array(v, row, idx, |v, x: bool| v.boolean(x));
    }
    if ty == Type::INT2_ARRAY {
        return array(v, row, idx, |v, x: i16| v.integer(i64::from(x)));
    }
    if ty == Type::INT4_ARRAY {
        return array(v, row, idx, |v, x: i32| v.integer(i64::from(x)));
    }
    if ty == Type::INT8_ARRAY {
        return array(v, row, idx, |v, x: i64| v.integer(x));
    }
    if ty == Type::FLOAT4_ARRAY {
        return array(v, row, idx, |v, x: f32| v.float(f64::from(x)));
    }
    if ty == Type::FLOAT8_ARRAY {
        return array(v, row, idx, |v, x: f64| v.float(x));
    }
    if ty == Type::NUMERIC_ARRAY {
        return array(v, row, idx, |v, x: PgNumeric| v.numeric(&x.0));
    }
    if ty == Type::TEXT_ARRAY
        || ty == Type::VARCHAR_ARRAY
        || ty == Type::BPCHAR_ARRAY
        || ty == Type::NAME_ARRAY
    {
        return array(v, row, idx, |v, x: String| v.string(&x));
    }
    if ty == Type::UUID_ARRAY {
        return array(v, row, idx, |v, x: Uuid| v.string(&x.to_string()));
    }
    if ty == Type::DATE_ARRAY {
        return array(v, row, idx, |v, x: NaiveDate| v.date(x));
    }
    if ty == Type::TIMESTAMP_ARRAY {
        return array(v, row, idx, |v, x: NaiveDateTime| {
            v.datetime(DateTime::<Utc>::from_naive_utc_and_offset(x, Utc))
        });
    }
    if ty == Type::TIMESTAMPTZ_ARRAY {
        return array(v, row, idx, |v, x: DateTime<Utc>| v.datetime(x));
    }
    if ty == Type::BYTEA_ARRAY {
        return array(v, row, idx, |v, x: Vec<u8>| v.bytes(&x));
    }

    Err(ProtocolError::UnsupportedColumnType(ty.to_string()))
}

fn emit_opt<T>(
    v: &mut dyn RecordSetVisitor,
    value: Option<T>,
    emit: impl FnOnce(&mut dyn RecordSetVisitor, T) -> Result<()>,
) -> Result<()> {
    match value {
        Some(x) => emit(v, x),
        None => v.null(),
    }
}

fn array<'r, T: FromSql<'r>>(
    v: &mut dyn RecordSetVisitor,
    row: &'r Row,
    idx: usize,
    emit: impl Fn(&mut dyn RecordSetVisitor, T) -> Result<()>,
) -> Result<()> {
    match row.try_get::<_, Option<Vec<Option<T>>>>(idx)? {
        None => v.null(),
        Some(items) => {
            v.begin_array(items.len())?;
            for item in items {
                match item {
                    Some(x) => emit(v, x)?,
                    None => v.null()?,
                }
            }
            v.end_array()
        }
    }
}
