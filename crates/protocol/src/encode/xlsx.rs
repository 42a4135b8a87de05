//! Spreadsheet encoder
//!
//! Each record set becomes a sheet with a header row; numbers, booleans and
//! dates keep their native cell types. Cells are buffered as plain values
//! and the workbook is assembled once at finish time, which keeps the event
//! handling a flat state machine. The byte cap is enforced twice: on the
//! accumulated cell text while streaming, and on the serialized workbook.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::{ProtocolError, Result};
use crate::visitor::{RecordSetResponder, RecordSetVisitor, ResponseBody};

/// MIME type of xlsx workbooks
pub const XLSX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone)]
enum Cell {
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Cell {
    /// Rough content size used against the streaming cap
    fn weight(&self) -> usize {
        match self {
            Cell::Empty => 0,
            Cell::Bool(_) => 5,
            Cell::Number(_) | Cell::Date(_) | Cell::DateTime(_) => 20,
            Cell::Text(s) => s.len(),
        }
    }
}

#[derive(Default)]
struct Sheet {
    rows: Vec<Vec<Cell>>,
}

/// Visitor producing an xlsx workbook
pub struct XlsxRecordSetWriter {
    max_bytes: usize,
    accumulated: usize,
    depth: u32,
    sheets: Vec<Sheet>,
    sheet_open: bool,
    row_open: bool,
    column_filled: bool,
}

impl XlsxRecordSetWriter {
    /// Create an encoder bounded by `max_bytes`
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            accumulated: 0,
            depth: 0,
            sheets: Vec::new(),
            sheet_open: false,
            row_open: false,
            column_filled: false,
        }
    }

    fn check(&self) -> Result<()> {
        if self.accumulated > self.max_bytes {
            return Err(ProtocolError::ResponseTooLong);
        }
        Ok(())
    }

    fn open_sheet(&mut self) {
        self.sheets.push(Sheet::default());
        self.sheet_open = true;
    }

    fn push_cell(&mut self, cell: Cell) -> Result<()> {
        if self.depth > 0 || self.column_filled {
            return Ok(());
        }
        if !self.sheet_open {
            self.open_sheet();
        }
        if !self.row_open {
            if let Some(sheet) = self.sheets.last_mut() {
                sheet.rows.push(Vec::new());
            }
            self.row_open = true;
        }
        self.accumulated += cell.weight();
        if let Some(row) = self.sheets.last_mut().and_then(|s| s.rows.last_mut()) {
            row.push(cell);
        }
        self.column_filled = true;
        self.check()
    }

    /// A marker cell for arrays/objects; nested scalars are suppressed by
    /// the depth counter
    fn push_marker(&mut self, marker: &str) -> Result<()> {
        self.push_cell(Cell::Text(marker.to_string()))?;
        self.depth += 1;
        Ok(())
    }
}

impl RecordSetVisitor for XlsxRecordSetWriter {
    fn begin_batch(&mut self) -> Result<()> {
        Ok(())
    }

    fn end_batch(&mut self) -> Result<()> {
        Ok(())
    }

    fn begin_record_set(&mut self, _columns: &[String]) -> Result<()> {
        Ok(())
    }

    fn end_record_set(&mut self) -> Result<()> {
        self.sheet_open = false;
        Ok(())
    }

    fn begin_record(&mut self, columns: &[String]) -> Result<()> {
        if !self.sheet_open {
            // the header renders at the first record, not in
            // begin_record_set, so single-row composite reads still get
            // their column names
            self.open_sheet();
            let header = columns
                .iter()
                .map(|name| {
                    self.accumulated += name.len();
                    Cell::Text(name.clone())
                })
                .collect();
            if let Some(sheet) = self.sheets.last_mut() {
                sheet.rows.push(header);
            }
        }
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.rows.push(Vec::new());
        }
        self.row_open = true;
        self.check()
    }

    fn end_record(&mut self) -> Result<()> {
        self.row_open = false;
        Ok(())
    }

    fn begin_column(&mut self, _name: &str) -> Result<()> {
        self.depth = 0;
        self.column_filled = false;
        Ok(())
    }

    fn end_column(&mut self) -> Result<()> {
        if !self.column_filled {
            // nulls still occupy their cell to keep columns aligned
            self.push_cell(Cell::Empty)?;
        }
        self.column_filled = false;
        Ok(())
    }

    fn begin_array(&mut self, _len: usize) -> Result<()> {
        self.push_marker("array")
    }

    fn end_array(&mut self) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn begin_object(&mut self) -> Result<()> {
        self.push_marker("object")
    }

    fn end_object(&mut self) -> Result<()> {
        self.depth -= 1;
        Ok(())
    }

    fn null(&mut self) -> Result<()> {
        if self.depth > 0 {
            return Ok(());
        }
        self.push_cell(Cell::Empty)
    }

    fn boolean(&mut self, v: bool) -> Result<()> {
        self.push_cell(Cell::Bool(v))
    }

    fn integer(&mut self, v: i64) -> Result<()> {
        self.push_cell(Cell::Number(v as f64))
    }

    fn float(&mut self, v: f64) -> Result<()> {
        self.push_cell(Cell::Number(v))
    }

    fn numeric(&mut self, v: &str) -> Result<()> {
        self.push_cell(Cell::Text(v.to_string()))
    }

    fn date(&mut self, v: NaiveDate) -> Result<()> {
        self.push_cell(Cell::Date(v))
    }

    fn datetime(&mut self, v: DateTime<Utc>) -> Result<()> {
        self.push_cell(Cell::DateTime(v.naive_utc()))
    }

    fn string(&mut self, v: &str) -> Result<()> {
        self.push_cell(Cell::Text(v.to_string()))
    }

    fn bytes(&mut self, v: &[u8]) -> Result<()> {
        self.push_cell(Cell::Text(STANDARD.encode(v)))
    }

    fn json(&mut self, v: &str) -> Result<()> {
        self.push_cell(Cell::Text(v.to_string()))
    }
}

impl RecordSetResponder for XlsxRecordSetWriter {
    fn finish(self: Box<Self>) -> Result<ResponseBody> {
        let mut workbook = Workbook::new();
        let date_format = Format::new().set_num_format("yyyy-mm-dd");
        let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

        for sheet in &self.sheets {
            let worksheet = workbook.add_worksheet();
            for (r, row) in sheet.rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let (r, c) = (r as u32, c as u16);
                    match cell {
                        Cell::Empty => continue,
                        Cell::Bool(v) => worksheet.write_boolean(r, c, *v),
                        Cell::Number(v) => worksheet.write_number(r, c, *v),
                        Cell::Text(v) => worksheet.write_string(r, c, v),
                        Cell::Date(v) => {
                            worksheet.write_datetime_with_format(r, c, *v, &date_format)
                        }
                        Cell::DateTime(v) => {
                            worksheet.write_datetime_with_format(r, c, *v, &datetime_format)
                        }
                    }
                    .map_err(|e| ProtocolError::Spreadsheet(e.to_string()))?;
                }
            }
        }

        let body = workbook
            .save_to_buffer()
            .map_err(|e| ProtocolError::Spreadsheet(e.to_string()))?;
        if body.len() > self.max_bytes {
            return Err(ProtocolError::ResponseTooLong);
        }

        Ok(ResponseBody {
            content_type: XLSX_MIME_TYPE.to_string(),
            body,
        })
    }
}
