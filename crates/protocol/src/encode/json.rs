//! JSON encoder
//!
//! Emits one well-formed JSON value. A small stack of container states
//! decides, before each value or key, whether a comma or colon separator is
//! due; nothing else about the event stream is remembered.
//!
//! Strings escape the RFC 8259 set plus `<`, `>`, `&`, U+2028 and U+2029 so
//! responses can be embedded in HTML and JavaScript contexts.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

use crate::error::{ProtocolError, Result};
use crate::visitor::{RecordSetResponder, RecordSetVisitor, ResponseBody};

/// Separator state of one open container
#[derive(Debug, Clone, Copy)]
enum State {
    /// Array before its first element
    ArrayInit,
    /// Array between elements
    Array,
    /// Object before a key
    ObjectKey,
    /// Object between a key and its value
    ObjectValue,
    /// Object before its first key
    ObjectInit,
}

/// Visitor producing a JSON response
pub struct JsonRecordSetWriter {
    out: Vec<u8>,
    stack: Vec<State>,
    max_bytes: usize,
}

impl JsonRecordSetWriter {
    /// Create an encoder bounded by `max_bytes`
    pub fn new(max_bytes: usize) -> Self {
        Self {
            out: Vec::new(),
            stack: Vec::with_capacity(4),
            max_bytes,
        }
    }

    /// Encoded bytes so far (for tests)
    pub fn as_bytes(&self) -> &[u8] {
        &self.out
    }

    /// Write the pending separator for the current container
    fn prepare(&mut self) {
        if let Some(state) = self.stack.last_mut() {
            match state {
                State::ArrayInit => *state = State::Array,
                State::Array => self.out.push(b','),
                State::ObjectInit => *state = State::ObjectValue,
                State::ObjectValue => {
                    self.out.push(b':');
                    *state = State::ObjectKey;
                }
                State::ObjectKey => {
                    self.out.push(b',');
                    *state = State::ObjectValue;
                }
            }
        }
    }

    fn check_size(&self) -> Result<()> {
        if self.out.len() > self.max_bytes {
            return Err(ProtocolError::ResponseTooLong);
        }
        Ok(())
    }

    fn open(&mut self, state: State, byte: u8) -> Result<()> {
        self.prepare();
        self.stack.push(state);
        self.out.push(byte);
        self.check_size()
    }

    fn close(&mut self, byte: u8) -> Result<()> {
        self.stack.pop();
        self.out.push(byte);
        self.check_size()
    }

    fn raw(&mut self, text: &str) -> Result<()> {
        self.prepare();
        self.out.extend_from_slice(text.as_bytes());
        self.check_size()
    }

    fn escaped(&mut self, v: &str) -> Result<()> {
        self.prepare();
        self.write_escaped(v);
        self.check_size()
    }

    fn write_escaped(&mut self, v: &str) {
        const HEX: &[u8; 16] = b"0123456789abcdef";

        self.out.push(b'"');
        for c in v.chars() {
            match c {
                '"' | '\\' => {
                    self.out.push(b'\\');
                    self.out.push(c as u8);
                }
                '\n' => self.out.extend_from_slice(b"\\n"),
                '\r' => self.out.extend_from_slice(b"\\r"),
                '\t' => self.out.extend_from_slice(b"\\t"),
                c if (c as u32) < 0x20 || c == '<' || c == '>' || c == '&' => {
                    let b = c as u32;
                    self.out.extend_from_slice(b"\\u00");
                    self.out.push(HEX[(b >> 4) as usize]);
                    self.out.push(HEX[(b & 0xF) as usize]);
                }
                '\u{2028}' | '\u{2029}' => {
                    self.out.extend_from_slice(b"\\u202");
                    self.out.push(HEX[(c as usize) & 0xF]);
                }
                c => {
                    let mut buf = [0u8; 4];
                    self.out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        self.out.push(b'"');
    }
}

impl RecordSetVisitor for JsonRecordSetWriter {
    fn begin_batch(&mut self) -> Result<()> {
        self.begin_array(0)
    }

    fn end_batch(&mut self) -> Result<()> {
        self.end_array()
    }

    fn begin_record_set(&mut self, _columns: &[String]) -> Result<()> {
        self.begin_array(0)
    }

    fn end_record_set(&mut self) -> Result<()> {
        self.end_array()
    }

    fn begin_record(&mut self, _columns: &[String]) -> Result<()> {
        self.begin_object()
    }

    fn end_record(&mut self) -> Result<()> {
        self.end_object()
    }

    fn begin_column(&mut self, name: &str) -> Result<()> {
        self.escaped(name)
    }

    fn end_column(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_array(&mut self, _len: usize) -> Result<()> {
        self.open(State::ArrayInit, b'[')
    }

    fn end_array(&mut self) -> Result<()> {
        self.close(b']')
    }

    fn begin_object(&mut self) -> Result<()> {
        self.open(State::ObjectInit, b'{')
    }

    fn end_object(&mut self) -> Result<()> {
        self.close(b'}')
    }

    fn null(&mut self) -> Result<()> {
        self.raw("null")
    }

    fn boolean(&mut self, v: bool) -> Result<()> {
        self.raw(if v { "true" } else { "false" })
    }

    fn integer(&mut self, v: i64) -> Result<()> {
        self.raw(&v.to_string())
    }

    fn float(&mut self, v: f64) -> Result<()> {
        self.raw(&format!("{v}"))
    }

    fn numeric(&mut self, v: &str) -> Result<()> {
        if v == "NaN" {
            self.raw("\"NaN\"")
        } else {
            self.raw(v)
        }
    }

    fn date(&mut self, v: NaiveDate) -> Result<()> {
        self.raw(&format!("\"{}\"", v.format("%Y-%m-%d")))
    }

    fn datetime(&mut self, v: DateTime<Utc>) -> Result<()> {
        self.raw(&format!("\"{}\"", v.to_rfc3339_opts(SecondsFormat::Secs, true)))
    }

    fn string(&mut self, v: &str) -> Result<()> {
        self.escaped(v)
    }

    fn bytes(&mut self, v: &[u8]) -> Result<()> {
        self.prepare();
        self.out.push(b'"');
        self.out.extend_from_slice(STANDARD.encode(v).as_bytes());
        self.out.push(b'"');
        self.check_size()
    }

    fn json(&mut self, v: &str) -> Result<()> {
        self.raw(v)
    }
}

impl RecordSetResponder for JsonRecordSetWriter {
    fn finish(self: Box<Self>) -> Result<ResponseBody> {
        Ok(ResponseBody {
            content_type: "application/json; charset=utf-8".to_string(),
            body: self.out,
        })
    }
}
