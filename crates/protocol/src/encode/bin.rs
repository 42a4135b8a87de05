//! Binary passthrough encoder
//!
//! Carries exactly one scalar, raw. Any structural event means the route
//! does not actually produce a single scalar and the request fails.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{ProtocolError, Result};
use crate::visitor::{RecordSetResponder, RecordSetVisitor, ResponseBody};

/// Built-in MIME type of the `bin` extension
pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";

/// Visitor writing one scalar value verbatim
pub struct BinRecordSetWriter {
    out: Vec<u8>,
    max_bytes: usize,
    content_type: String,
}

impl BinRecordSetWriter {
    /// Create an encoder bounded by `max_bytes`, responding with the given
    /// content type
    pub fn new(max_bytes: usize, content_type: impl Into<String>) -> Self {
        Self {
            out: Vec::new(),
            max_bytes,
            content_type: content_type.into(),
        }
    }

    fn scalar(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.out.is_empty() {
            return Err(ProtocolError::MultipleScalars);
        }
        self.out.extend_from_slice(bytes);
        if self.out.len() > self.max_bytes {
            return Err(ProtocolError::ResponseTooLong);
        }
        Ok(())
    }
}

impl RecordSetVisitor for BinRecordSetWriter {
    fn begin_batch(&mut self) -> Result<()> {
        Err(ProtocolError::BatchUnsupported("binary"))
    }

    fn end_batch(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_record_set(&mut self, _columns: &[String]) -> Result<()> {
        Err(ProtocolError::StructureUnsupported("Record sets"))
    }

    fn end_record_set(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_record(&mut self, _columns: &[String]) -> Result<()> {
        Err(ProtocolError::StructureUnsupported("Record sets"))
    }

    fn end_record(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_column(&mut self, _name: &str) -> Result<()> {
        Err(ProtocolError::StructureUnsupported("Record sets"))
    }

    fn end_column(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_array(&mut self, _len: usize) -> Result<()> {
        Err(ProtocolError::StructureUnsupported("Arrays"))
    }

    fn end_array(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_object(&mut self) -> Result<()> {
        Err(ProtocolError::StructureUnsupported("Objects"))
    }

    fn end_object(&mut self) -> Result<()> {
        Ok(())
    }

    fn null(&mut self) -> Result<()> {
        Ok(())
    }

    fn boolean(&mut self, v: bool) -> Result<()> {
        self.scalar(if v { b"true" } else { b"false" })
    }

    fn integer(&mut self, v: i64) -> Result<()> {
        self.scalar(v.to_string().as_bytes())
    }

    fn float(&mut self, v: f64) -> Result<()> {
        self.scalar(format!("{v}").as_bytes())
    }

    fn numeric(&mut self, v: &str) -> Result<()> {
        self.scalar(v.as_bytes())
    }

    fn date(&mut self, v: NaiveDate) -> Result<()> {
        self.scalar(v.format("%Y-%m-%d").to_string().as_bytes())
    }

    fn datetime(&mut self, v: DateTime<Utc>) -> Result<()> {
        self.scalar(v.to_rfc3339_opts(SecondsFormat::Secs, true).as_bytes())
    }

    fn string(&mut self, v: &str) -> Result<()> {
        self.scalar(v.as_bytes())
    }

    fn bytes(&mut self, v: &[u8]) -> Result<()> {
        self.scalar(v)
    }

    fn json(&mut self, v: &str) -> Result<()> {
        self.scalar(v.as_bytes())
    }
}

impl RecordSetResponder for BinRecordSetWriter {
    fn finish(self: Box<Self>) -> Result<ResponseBody> {
        Ok(ResponseBody {
            content_type: self.content_type,
            body: self.out,
        })
    }
}
