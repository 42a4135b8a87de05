//! Encoder golden tests
//!
//! Each test drives a visitor with a synthetic event stream and checks the
//! finished payload byte for byte where the format is textual.

use chrono::NaiveDate;

use crate::encode::{BinRecordSetWriter, CsvRecordSetWriter, JsonRecordSetWriter, XlsxRecordSetWriter};
use crate::error::ProtocolError;
use crate::visitor::{RecordSetResponder, RecordSetVisitor};

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Emit one record with the given scalar writer per column
fn record(
    v: &mut dyn RecordSetVisitor,
    columns: &[String],
    values: &mut [&mut dyn FnMut(&mut dyn RecordSetVisitor) -> crate::Result<()>],
) -> crate::Result<()> {
    v.begin_record(columns)?;
    for (name, write) in columns.iter().zip(values.iter_mut()) {
        v.begin_column(name)?;
        write(v)?;
        v.end_column()?;
    }
    v.end_record()
}

#[test]
fn json_record_set_of_objects() {
    let columns = cols(&["id", "name"]);
    let mut w = JsonRecordSetWriter::new(1024);

    w.begin_record_set(&columns).unwrap();
    record(
        &mut w,
        &columns,
        &mut [&mut |v| v.integer(42), &mut |v| v.string("zoe")],
    )
    .unwrap();
    record(
        &mut w,
        &columns,
        &mut [&mut |v| v.integer(11), &mut |v| v.string("yann")],
    )
    .unwrap();
    w.end_record_set().unwrap();

    let body = Box::new(w).finish().unwrap();
    assert_eq!(body.content_type, "application/json; charset=utf-8");
    assert_eq!(
        body.body,
        br#"[{"id":42,"name":"zoe"},{"id":11,"name":"yann"}]"#
    );
}

#[test]
fn json_batch_wraps_record_sets() {
    let columns = cols(&["n"]);
    let mut w = JsonRecordSetWriter::new(1024);

    w.begin_batch().unwrap();
    for value in [1i64, 2] {
        w.begin_record_set(&columns).unwrap();
        record(&mut w, &columns, &mut [&mut |v| v.integer(value)]).unwrap();
        w.end_record_set().unwrap();
    }
    w.end_batch().unwrap();

    assert_eq!(w.as_bytes(), br#"[[{"n":1}],[{"n":2}]]"#);
}

#[test]
fn json_escapes_for_embedding() {
    let columns = cols(&["s"]);
    let mut w = JsonRecordSetWriter::new(1024);
    w.begin_record_set(&columns).unwrap();
    record(&mut w, &columns, &mut [&mut |v| v.string("<a>&\n\u{2028}")]).unwrap();
    w.end_record_set().unwrap();

    assert_eq!(
        w.as_bytes(),
        br#"[{"s":"\u003ca\u003e\u0026\n\u2028"}]"#
    );
}

#[test]
fn json_nan_numeric_is_quoted() {
    let columns = cols(&["x", "y"]);
    let mut w = JsonRecordSetWriter::new(1024);
    w.begin_record_set(&columns).unwrap();
    record(
        &mut w,
        &columns,
        &mut [&mut |v| v.numeric("NaN"), &mut |v| v.numeric("12.50")],
    )
    .unwrap();
    w.end_record_set().unwrap();

    assert_eq!(w.as_bytes(), br#"[{"x":"NaN","y":12.50}]"#);
}

#[test]
fn json_arrays_and_nulls_nest() {
    let columns = cols(&["tags"]);
    let mut w = JsonRecordSetWriter::new(1024);
    w.begin_record_set(&columns).unwrap();
    w.begin_record(&columns).unwrap();
    w.begin_column("tags").unwrap();
    w.begin_array(3).unwrap();
    w.string("a").unwrap();
    w.null().unwrap();
    w.string("b").unwrap();
    w.end_array().unwrap();
    w.end_column().unwrap();
    w.end_record().unwrap();
    w.end_record_set().unwrap();

    assert_eq!(w.as_bytes(), br#"[{"tags":["a",null,"b"]}]"#);
}

#[test]
fn json_respects_size_cap() {
    let columns = cols(&["s"]);
    let mut w = JsonRecordSetWriter::new(8);
    w.begin_record_set(&columns).unwrap();
    let err = record(&mut w, &columns, &mut [&mut |v| v.string("0123456789")]).unwrap_err();
    assert!(matches!(err, ProtocolError::ResponseTooLong));
}

#[test]
fn csv_report_golden() {
    let columns = cols(&["day", "total"]);
    let mut w = CsvRecordSetWriter::new(1024);

    w.begin_record_set(&columns).unwrap();
    record(
        &mut w,
        &columns,
        &mut [
            &mut |v| v.date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            &mut |v| v.numeric("12.50"),
        ],
    )
    .unwrap();
    record(
        &mut w,
        &columns,
        &mut [
            &mut |v| v.date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
            &mut |v| v.numeric("7.00"),
        ],
    )
    .unwrap();
    w.end_record_set().unwrap();

    let body = Box::new(w).finish().unwrap();
    assert_eq!(body.content_type, "text/csv; charset=utf-8");
    assert_eq!(
        body.body,
        b"\"day\",\"total\"\r\n2024-01-01,12.50\r\n2024-01-02,7.00\r\n"
    );
}

#[test]
fn csv_quotes_strings_and_doubles_quotes() {
    let columns = cols(&["s"]);
    let mut w = CsvRecordSetWriter::new(1024);
    w.begin_record_set(&columns).unwrap();
    record(&mut w, &columns, &mut [&mut |v| v.string("say \"hi\"")]).unwrap();
    w.end_record_set().unwrap();

    assert_eq!(w.as_bytes(), b"\"s\"\r\n\"say \"\"hi\"\"\"\r\n");
}

#[test]
fn csv_flattens_structures_to_markers() {
    let columns = cols(&["tags", "meta"]);
    let mut w = CsvRecordSetWriter::new(1024);
    w.begin_record_set(&columns).unwrap();
    w.begin_record(&columns).unwrap();
    w.begin_column("tags").unwrap();
    w.begin_array(2).unwrap();
    w.string("hidden").unwrap();
    w.integer(5).unwrap();
    w.end_array().unwrap();
    w.end_column().unwrap();
    w.begin_column("meta").unwrap();
    w.begin_object().unwrap();
    w.string("k").unwrap();
    w.string("v").unwrap();
    w.end_object().unwrap();
    w.end_column().unwrap();
    w.end_record().unwrap();
    w.end_record_set().unwrap();

    assert_eq!(w.as_bytes(), b"\"tags\",\"meta\"\r\narray,object\r\n");
}

#[test]
fn csv_rejects_batches() {
    let mut w = CsvRecordSetWriter::new(1024);
    let err = w.begin_batch().unwrap_err();
    assert_eq!(err.to_string(), "Batch mode not supported by CSV format.");
}

#[test]
fn csv_null_is_empty_field() {
    let columns = cols(&["a", "b"]);
    let mut w = CsvRecordSetWriter::new(1024);
    w.begin_record_set(&columns).unwrap();
    record(
        &mut w,
        &columns,
        &mut [&mut |v| v.null(), &mut |v| v.integer(1)],
    )
    .unwrap();
    w.end_record_set().unwrap();

    assert_eq!(w.as_bytes(), b"\"a\",\"b\"\r\n,1\r\n");
}

#[test]
fn binary_passes_bytes_raw() {
    let mut w = BinRecordSetWriter::new(1024, "application/octet-stream");
    w.bytes(&[0, 159, 146, 150]).unwrap();
    let body = Box::new(w).finish().unwrap();
    assert_eq!(body.content_type, "application/octet-stream");
    assert_eq!(body.body, vec![0, 159, 146, 150]);
}

#[test]
fn binary_rejects_second_scalar() {
    let mut w = BinRecordSetWriter::new(1024, "application/octet-stream");
    w.string("one").unwrap();
    let err = w.string("two").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Binary format may contain only one scalar value."
    );
}

#[test]
fn binary_rejects_structure() {
    let mut w = BinRecordSetWriter::new(1024, "application/octet-stream");
    assert!(w.begin_record_set(&cols(&["a"])).is_err());
    assert!(w.begin_array(1).is_err());
    assert!(w.begin_batch().is_err());
}

#[test]
fn xlsx_builds_one_sheet_per_record_set() {
    let columns = cols(&["id", "when"]);
    let mut w = XlsxRecordSetWriter::new(1 << 20);

    w.begin_batch().unwrap();
    for _ in 0..2 {
        w.begin_record_set(&columns).unwrap();
        record(
            &mut w,
            &columns,
            &mut [
                &mut |v| v.integer(1),
                &mut |v| v.date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            ],
        )
        .unwrap();
        w.end_record_set().unwrap();
    }
    w.end_batch().unwrap();

    let body = Box::new(w).finish().unwrap();
    // xlsx payloads are zip archives
    assert_eq!(&body.body[..2], b"PK");
    assert!(!body.body.is_empty());
}

#[test]
fn xlsx_respects_streaming_cap() {
    let columns = cols(&["s"]);
    let mut w = XlsxRecordSetWriter::new(16);
    w.begin_record_set(&columns).unwrap();
    let err = record(&mut w, &columns, &mut [&mut |v| {
        v.string("a very long cell value exceeding the cap")
    }])
    .unwrap_err();
    assert!(matches!(err, ProtocolError::ResponseTooLong));
}
