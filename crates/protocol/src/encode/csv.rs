//! CSV encoder
//!
//! One record set per response. State is a first-column flag and a depth
//! counter: arrays and objects flatten to literal `array`/`object` markers
//! and the counter suppresses their nested scalars.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{ProtocolError, Result};
use crate::visitor::{RecordSetResponder, RecordSetVisitor, ResponseBody};

/// Visitor producing a CSV response
pub struct CsvRecordSetWriter {
    out: Vec<u8>,
    max_bytes: usize,
    first_column: bool,
    depth: u32,
}

impl CsvRecordSetWriter {
    /// Create an encoder bounded by `max_bytes`
    pub fn new(max_bytes: usize) -> Self {
        Self {
            out: Vec::new(),
            max_bytes,
            first_column: true,
            depth: 0,
        }
    }

    /// Encoded bytes so far (for tests)
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    fn check_size(&self) -> Result<()> {
        if self.out.len() > self.max_bytes {
            return Err(ProtocolError::ResponseTooLong);
        }
        Ok(())
    }

    fn field(&mut self, text: &str) -> Result<()> {
        if self.depth > 0 {
            return Ok(());
        }
        self.out.extend_from_slice(text.as_bytes());
        self.check_size()
    }

    fn quoted(&mut self, v: &str) -> Result<()> {
        if self.depth > 0 {
            return Ok(());
        }
        self.out.push(b'"');
        self.out
            .extend_from_slice(v.replace('"', "\"\"").as_bytes());
        self.out.push(b'"');
        self.check_size()
    }
}

impl RecordSetVisitor for CsvRecordSetWriter {
    fn begin_batch(&mut self) -> Result<()> {
        Err(ProtocolError::BatchUnsupported("CSV"))
    }

    fn end_batch(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_record_set(&mut self, _columns: &[String]) -> Result<()> {
        Ok(())
    }

    fn end_record_set(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_record(&mut self, columns: &[String]) -> Result<()> {
        if self.out.is_empty() {
            // the header renders here, not in begin_record_set, so
            // single-row composite reads still get their column names
            for (i, name) in columns.iter().enumerate() {
                if i > 0 {
                    self.out.push(b',');
                }
                self.out.push(b'"');
                self.out
                    .extend_from_slice(name.replace('"', "\"\"").as_bytes());
                self.out.push(b'"');
            }
            self.out.extend_from_slice(b"\r\n");
        }
        self.first_column = true;
        self.check_size()
    }

    fn end_record(&mut self) -> Result<()> {
        self.out.extend_from_slice(b"\r\n");
        self.check_size()
    }

    fn begin_column(&mut self, _name: &str) -> Result<()> {
        if self.first_column {
            self.first_column = false;
        } else {
            self.out.push(b',');
        }
        self.depth = 0;
        self.check_size()
    }

    fn end_column(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_array(&mut self, _len: usize) -> Result<()> {
        if self.depth == 0 {
            self.out.extend_from_slice(b"array");
        }
        self.depth += 1;
        self.check_size()
    }

    fn end_array(&mut self) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn begin_object(&mut self) -> Result<()> {
        if self.depth == 0 {
            self.out.extend_from_slice(b"object");
        }
        self.depth += 1;
        self.check_size()
    }

    fn end_object(&mut self) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn null(&mut self) -> Result<()> {
        Ok(())
    }

    fn boolean(&mut self, v: bool) -> Result<()> {
        self.field(if v { "true" } else { "false" })
    }

    fn integer(&mut self, v: i64) -> Result<()> {
        self.field(&v.to_string())
    }

    fn float(&mut self, v: f64) -> Result<()> {
        self.field(&format!("{v}"))
    }

    fn numeric(&mut self, v: &str) -> Result<()> {
        self.field(v)
    }

    fn date(&mut self, v: NaiveDate) -> Result<()> {
        self.field(&v.format("%Y-%m-%d").to_string())
    }

    fn datetime(&mut self, v: DateTime<Utc>) -> Result<()> {
        self.field(&v.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    fn string(&mut self, v: &str) -> Result<()> {
        self.quoted(v)
    }

    fn bytes(&mut self, v: &[u8]) -> Result<()> {
        if self.depth > 0 {
            return Ok(());
        }
        self.out.extend_from_slice(STANDARD.encode(v).as_bytes());
        self.check_size()
    }

    fn json(&mut self, v: &str) -> Result<()> {
        self.quoted(v)
    }
}

impl RecordSetResponder for CsvRecordSetWriter {
    fn finish(self: Box<Self>) -> Result<ResponseBody> {
        Ok(ResponseBody {
            content_type: "text/csv; charset=utf-8".to_string(),
            body: self.out,
        })
    }
}
