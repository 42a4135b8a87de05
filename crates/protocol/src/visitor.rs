//! Record-set visitor
//!
//! Decoded rows reach the format encoders through this push-style event
//! interface. The shape of a response is a batch of record sets, each a
//! sequence of records, each a sequence of named columns; inside a column a
//! single scalar, array, or object group of events occurs.
//!
//! Encoders are explicit state machines rather than generators: every event
//! is a plain method call and the encoder tracks whatever context it needs
//! (container stacks, depth counters, first-column flags).

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;

/// Push-style consumer of decoded result sets
pub trait RecordSetVisitor {
    /// A batch request starts; record sets follow in request order
    fn begin_batch(&mut self) -> Result<()>;
    fn end_batch(&mut self) -> Result<()>;

    /// One statement's result starts; `columns` lists its column names
    fn begin_record_set(&mut self, columns: &[String]) -> Result<()>;
    fn end_record_set(&mut self) -> Result<()>;

    /// One row starts. `columns` repeats the column names so single-row
    /// reads (composite procedure returns) can skip the record-set frame
    /// and still render headers.
    fn begin_record(&mut self, columns: &[String]) -> Result<()>;
    fn end_record(&mut self) -> Result<()>;

    fn begin_column(&mut self, name: &str) -> Result<()>;
    fn end_column(&mut self) -> Result<()>;

    fn begin_array(&mut self, len: usize) -> Result<()>;
    fn end_array(&mut self) -> Result<()>;

    fn begin_object(&mut self) -> Result<()>;
    fn end_object(&mut self) -> Result<()>;

    fn null(&mut self) -> Result<()>;
    fn boolean(&mut self, v: bool) -> Result<()>;
    fn integer(&mut self, v: i64) -> Result<()>;
    fn float(&mut self, v: f64) -> Result<()>;
    /// Lossless decimal string; may be `NaN`
    fn numeric(&mut self, v: &str) -> Result<()>;
    fn date(&mut self, v: NaiveDate) -> Result<()>;
    fn datetime(&mut self, v: DateTime<Utc>) -> Result<()>;
    fn string(&mut self, v: &str) -> Result<()>;
    fn bytes(&mut self, v: &[u8]) -> Result<()>;
    /// Raw JSON text passed through from a json/jsonb column
    fn json(&mut self, v: &str) -> Result<()>;
}

/// Finished response payload produced by an encoder
#[derive(Debug)]
pub struct ResponseBody {
    /// `Content-Type` header value
    pub content_type: String,
    /// Response bytes, already bounded by the configured cap
    pub body: Vec<u8>,
}

/// A visitor that can conclude into an HTTP response payload
pub trait RecordSetResponder: RecordSetVisitor + Send {
    /// Consume the encoder and produce the response body
    fn finish(self: Box<Self>) -> Result<ResponseBody>;
}
