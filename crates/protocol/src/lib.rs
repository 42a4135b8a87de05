//! pgway Protocol - value codec between HTTP and PostgreSQL
//!
//! This crate owns every conversion of a concrete value:
//!
//! - `SqlParam` - a runtime-typed SQL parameter. Decoded from path segments,
//!   form fields or JSON bodies against the route's introspected parameter
//!   types, and bound positionally through `ToSql`.
//! - `RecordSetVisitor` - the push-style event stream produced while reading
//!   result rows. Typed column decoders are selected by type OID; values
//!   arrive as events (`boolean`, `integer`, `numeric`, ...), arrays and
//!   hstore as `begin_array`/`begin_object` groups.
//! - The four encoders consuming that stream: JSON, CSV, spreadsheet, and
//!   binary passthrough. Each enforces the response byte cap after every
//!   write, before any response header is committed.
//!
//! # Numeric correctness
//!
//! `numeric` values never travel through a binary float: parameters bind as
//! exact decimals, and result values are re-rendered from the wire format
//! into a lossless decimal string (`NaN` preserved).

mod decode;
mod encode;
mod error;
mod param;
mod rows;
mod types;
mod visitor;
mod wire;

pub use decode::{decode_form_value, decode_json_value, decode_path_value};
pub use encode::{
    BinRecordSetWriter, CsvRecordSetWriter, JsonRecordSetWriter, XlsxRecordSetWriter,
    OCTET_STREAM_MIME_TYPE, XLSX_MIME_TYPE,
};
pub use error::{ProtocolError, Result};
pub use param::{merge_defaults, merge_overwrite, QueryParams, SqlParam};
pub use rows::{visit_rows_affected, RecordSetReader};
pub use types::{ParameterType, ParameterTypes};
pub use visitor::{RecordSetResponder, RecordSetVisitor, ResponseBody};
pub use wire::{PgInet, PgMoney, PgNumeric, RawJson};

// Test modules - only compiled during testing
#[cfg(test)]
mod decode_test;
#[cfg(test)]
mod param_test;
#[cfg(test)]
mod wire_test;
