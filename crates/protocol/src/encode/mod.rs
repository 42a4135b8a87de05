//! Format encoders
//!
//! Four visitor implementations, one per response format. Every encoder
//! buffers its output and checks the byte cap after each write, so an
//! oversized result fails before any response header is committed.

mod bin;
mod csv;
mod json;
mod xlsx;

pub use bin::{BinRecordSetWriter, OCTET_STREAM_MIME_TYPE};
pub use csv::CsvRecordSetWriter;
pub use json::JsonRecordSetWriter;
pub use xlsx::{XlsxRecordSetWriter, XLSX_MIME_TYPE};

#[cfg(test)]
mod encode_test;
