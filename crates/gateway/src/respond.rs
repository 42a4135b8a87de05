//! Responder selection
//!
//! The format extension picks the encoder, with two special pairings: a
//! non-set bytea-returning procedure under `.xlsx`, and a non-set
//! text-returning procedure under `.csv`, both select the binary
//! passthrough with the structural format's MIME type instead of the
//! structural encoder itself. Routes serving pre-rendered spreadsheets or
//! CSV exports from the database rely on this.

use pgway_protocol::{
    BinRecordSetWriter, CsvRecordSetWriter, JsonRecordSetWriter, RecordSetResponder,
    XlsxRecordSetWriter, OCTET_STREAM_MIME_TYPE, XLSX_MIME_TYPE,
};
use pgway_schema::Route;
use tokio_postgres::types::Type;

use crate::error::{GatewayError, Result};
use crate::state::GatewayOptions;

const CSV_MIME_TYPE: &str = "text/csv; charset=utf-8";

/// Whether the route's procedure returns a single scalar of one of the
/// given types
fn returns_scalar_of(route: &Route, types: &[Type]) -> bool {
    route
        .procedure
        .as_ref()
        .is_some_and(|p| !p.returns_set && types.iter().any(|t| t.oid() == p.type_oid))
}

/// Pick the encoder for the requested extension
pub fn select_responder(
    ext: &str,
    route: &Route,
    options: &GatewayOptions,
) -> Result<Box<dyn RecordSetResponder>> {
    let max = options.max_response_bytes;

    let responder: Box<dyn RecordSetResponder> = match ext {
        "json" => Box::new(JsonRecordSetWriter::new(max)),
        "xlsx" => {
            if returns_scalar_of(route, &[Type::BYTEA]) {
                Box::new(BinRecordSetWriter::new(max, XLSX_MIME_TYPE))
            } else {
                Box::new(XlsxRecordSetWriter::new(max))
            }
        }
        "csv" => {
            if returns_scalar_of(route, &[Type::TEXT, Type::VARCHAR]) {
                Box::new(BinRecordSetWriter::new(max, CSV_MIME_TYPE))
            } else {
                Box::new(CsvRecordSetWriter::new(max))
            }
        }
        "bin" => Box::new(BinRecordSetWriter::new(max, OCTET_STREAM_MIME_TYPE)),
        other => match options.binary_formats.get(other) {
            Some(mime_type) => Box::new(BinRecordSetWriter::new(max, mime_type.clone())),
            None => return Err(GatewayError::UnknownFormat),
        },
    };

    Ok(responder)
}
