//! CSV decoder
//!
//! Turns a byte stream into [`DecodedRow`]s, one per CSV record, coercing each
//! field according to the table schema. Decoding is lazy and single-pass.
//!
//! Coercion rules:
//!
//! | Kind      | Empty            | Unparseable            |
//! |-----------|------------------|------------------------|
//! | Integer   | `Field::Missing` | `Field::Invalid(raw)`  |
//! | Timestamp | `Field::Missing` | `Field::Missing`       |
//! | Text      | `Present("")`    | n/a                    |

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashMap;
use std::io::Read;
use tracing::debug;

use super::schema::{ColumnKind, ColumnSpec, TableSchema};
use super::validator::{RejectReason, RowRejection};
use super::{IngestError, Result};

/// Whether the first line of the input names the columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderMode {
    /// Columns are taken positionally from the schema
    #[default]
    Headerless,
    /// The first record is a header; columns are matched by name or alias
    FromInput,
}

/// A successfully coerced value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i32),
    Text(String),
    Timestamp(DateTime<Utc>),
}

/// A decoded field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Present(Value),
    Missing,
    /// Coercion failed; holds the raw text
    Invalid(String),
}

/// One record keyed by canonical column name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRow {
    /// 1-based line number in the input
    pub line: u64,
    pub fields: HashMap<&'static str, Field>,
}

impl DecodedRow {
    pub fn get(&self, column: &str) -> Option<&Field> {
        self.fields.get(column)
    }

    pub(crate) fn take(&mut self, column: &str) -> Field {
        self.fields.remove(column).unwrap_or(Field::Missing)
    }
}

/// Failure to decode a single record
#[derive(Debug, thiserror::Error)]
pub enum RowDecodeError {
    /// The record is unusable but decoding can go on
    #[error("{0}")]
    Rejected(RowRejection),

    /// The underlying stream failed; nothing more can be read
    #[error("I/O error while reading CSV: {0}")]
    Io(#[from] std::io::Error),
}

/// Decoder over any byte stream
pub struct CsvDecoder<R> {
    reader: csv::Reader<R>,
    /// Column for each input position; `None` for header columns the schema does not know
    layout: Vec<Option<&'static ColumnSpec>>,
    shape: Vec<String>,
}

impl<R: Read> CsvDecoder<R> {
    /// Build a decoder, consuming the header line in [`HeaderMode::FromInput`]
    pub fn new(schema: &'static TableSchema, input: R, mode: HeaderMode) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(mode == HeaderMode::FromInput)
            .flexible(true)
            .from_reader(input);

        let layout: Vec<Option<&'static ColumnSpec>> = match mode {
            HeaderMode::Headerless => schema.columns.iter().map(Some).collect(),
            HeaderMode::FromInput => {
                let headers = reader.headers().map_err(read_error)?;
                headers.iter().map(|h| schema.resolve_header(h)).collect()
            },
        };

        let shape = layout
            .iter()
            .flatten()
            .map(|column| column.name.to_string())
            .collect::<Vec<_>>();

        debug!(table = %schema.table, ?mode, ?shape, "CSV decoder ready");

        Ok(Self {
            reader,
            layout,
            shape,
        })
    }

    /// Canonical names of the columns the input provides
    pub fn shape(&self) -> &[String] {
        &self.shape
    }

    /// Lazily decode the remaining records
    pub fn rows(self) -> DecodedRows<R> {
        DecodedRows {
            records: self.reader.into_records(),
            layout: self.layout,
        }
    }
}

/// Iterator returned by [`CsvDecoder::rows`]
pub struct DecodedRows<R> {
    records: csv::StringRecordsIntoIter<R>,
    layout: Vec<Option<&'static ColumnSpec>>,
}

impl<R: Read> Iterator for DecodedRows<R> {
    type Item = std::result::Result<DecodedRow, RowDecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(err) => return Some(Err(row_error(err))),
        };

        let line = record.position().map(|p| p.line()).unwrap_or_default();

        if record.len() != self.layout.len() {
            return Some(Err(RowDecodeError::Rejected(RowRejection {
                line,
                reason: RejectReason::FieldCount {
                    expected: self.layout.len(),
                    found: record.len(),
                },
            })));
        }

        let fields = self
            .layout
            .iter()
            .zip(record.iter())
            .filter_map(|(column, raw)| column.map(|c| (c.name, coerce(c.kind, raw))))
            .collect();

        Some(Ok(DecodedRow { line, fields }))
    }
}

fn read_error(err: csv::Error) -> IngestError {
    match err.into_kind() {
        csv::ErrorKind::Io(io) => IngestError::Read(io),
        other => IngestError::Read(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("{:?}", other),
        )),
    }
}

fn row_error(err: csv::Error) -> RowDecodeError {
    let line = err.position().map(|p| p.line()).unwrap_or_default();
    match err.into_kind() {
        csv::ErrorKind::Io(io) => RowDecodeError::Io(io),
        kind => RowDecodeError::Rejected(RowRejection {
            line,
            reason: RejectReason::Malformed {
                message: format!("{:?}", kind),
            },
        }),
    }
}

/// Apply a column's coercion rule to a raw field
pub fn coerce(kind: ColumnKind, raw: &str) -> Field {
    match kind {
        ColumnKind::Text => Field::Present(Value::Text(raw.to_string())),
        ColumnKind::Integer => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Field::Missing
            } else {
                trimmed
                    .parse::<i32>()
                    .map(|n| Field::Present(Value::Integer(n)))
                    .unwrap_or_else(|_| Field::Invalid(raw.to_string()))
            }
        },
        ColumnKind::Timestamp => parse_timestamp(raw)
            .map(|ts| Field::Present(Value::Timestamp(ts)))
            .unwrap_or(Field::Missing),
    }
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parse an ISO-like date-time; values without an offset are taken as UTC
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(ts.and_utc());
        }
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|ts| ts.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::schema::lookup;
    use chrono::TimeZone;

    fn decode(
        table: &str,
        input: &str,
        mode: HeaderMode,
    ) -> Vec<std::result::Result<DecodedRow, RowDecodeError>> {
        let schema = lookup(table).unwrap();
        CsvDecoder::new(schema, input.as_bytes(), mode)
            .unwrap()
            .rows()
            .collect()
    }

    #[test]
    fn test_headerless_assigns_columns_by_position() {
        let rows = decode("departments", "1,Sales\n2,Eng\n", HeaderMode::Headerless);
        assert_eq!(rows.len(), 2);

        let first = rows[0].as_ref().unwrap();
        assert_eq!(first.line, 1);
        assert_eq!(first.get("id"), Some(&Field::Present(Value::Integer(1))));
        assert_eq!(first.get("name"), Some(&Field::Present(Value::Text("Sales".into()))));
        assert_eq!(rows[1].as_ref().unwrap().line, 2);
    }

    #[test]
    fn test_headerless_shape_is_schema_order() {
        let schema = lookup("hired_employees").unwrap();
        let decoder = CsvDecoder::new(schema, "".as_bytes(), HeaderMode::Headerless).unwrap();
        assert_eq!(
            decoder.shape(),
            &["id", "name", "hire_timestamp", "department_id", "job_id"]
        );
        assert_eq!(decoder.rows().count(), 0);
    }

    #[test]
    fn test_field_count_mismatch_skips_row_only() {
        let input = "1,Analyst\n2\n3,Manager,extra\n4,Engineer\n";
        let rows = decode("jobs", input, HeaderMode::Headerless);
        assert_eq!(rows.len(), 4);
        assert!(rows[0].is_ok());
        assert!(matches!(
            &rows[1],
            Err(RowDecodeError::Rejected(RowRejection {
                line: 2,
                reason: RejectReason::FieldCount { expected: 2, found: 1 }
            }))
        ));
        assert!(matches!(
            &rows[2],
            Err(RowDecodeError::Rejected(RowRejection {
                reason: RejectReason::FieldCount { expected: 2, found: 3 },
                ..
            }))
        ));
        assert!(rows[3].is_ok());
    }

    #[test]
    fn test_integer_coercion() {
        assert_eq!(coerce(ColumnKind::Integer, " 42 "), Field::Present(Value::Integer(42)));
        assert_eq!(coerce(ColumnKind::Integer, ""), Field::Missing);
        assert_eq!(coerce(ColumnKind::Integer, "  "), Field::Missing);
        assert_eq!(coerce(ColumnKind::Integer, "4.5"), Field::Invalid("4.5".into()));
        assert_eq!(coerce(ColumnKind::Integer, "abc"), Field::Invalid("abc".into()));
        assert_eq!(
            coerce(ColumnKind::Integer, "99999999999"),
            Field::Invalid("99999999999".into())
        );
    }

    #[test]
    fn test_empty_text_is_present() {
        assert_eq!(coerce(ColumnKind::Text, ""), Field::Present(Value::Text(String::new())));

        let rows = decode("departments", "5,\n", HeaderMode::Headerless);
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.get("name"), Some(&Field::Present(Value::Text(String::new()))));
    }

    #[test]
    fn test_unparseable_timestamp_is_missing() {
        assert_eq!(coerce(ColumnKind::Timestamp, "not a date"), Field::Missing);
        assert_eq!(coerce(ColumnKind::Timestamp, ""), Field::Missing);
        assert_eq!(coerce(ColumnKind::Timestamp, "2021-13-40T00:00:00Z"), Field::Missing);
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2021, 11, 7, 2, 48, 42).unwrap();
        for raw in [
            "2021-11-07T02:48:42Z",
            "2021-11-07T02:48:42+00:00",
            "2021-11-07T04:48:42+02:00",
            "2021-11-07 02:48:42",
            "2021-11-07T02:48:42",
            "2021-11-07 02:48:42Z",
            " 2021-11-07T02:48:42Z ",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "format {raw:?}");
        }

        assert_eq!(
            parse_timestamp("2021-11-07"),
            Some(Utc.with_ymd_and_hms(2021, 11, 7, 0, 0, 0).unwrap())
        );
        assert!(parse_timestamp("2021-11-07T02:48:42.123Z").is_some());
    }

    #[test]
    fn test_header_mode_matches_names_and_aliases() {
        let input = "datetime,id,job_id,name,department_id,notes\n\
                     2021-01-01T00:00:00Z,10,3,Ana,2,hello\n";
        let schema = lookup("hired_employees").unwrap();
        let decoder = CsvDecoder::new(schema, input.as_bytes(), HeaderMode::FromInput).unwrap();
        assert_eq!(
            decoder.shape(),
            &["hire_timestamp", "id", "job_id", "name", "department_id"]
        );

        let rows: Vec<_> = decoder.rows().collect();
        let row = rows[0].as_ref().unwrap();
        assert_eq!(row.line, 2);
        assert_eq!(row.get("id"), Some(&Field::Present(Value::Integer(10))));
        assert_eq!(row.get("job_id"), Some(&Field::Present(Value::Integer(3))));
        assert!(row.get("notes").is_none());
    }

    #[test]
    fn test_header_mode_reports_partial_shape() {
        let schema = lookup("departments").unwrap();
        let decoder = CsvDecoder::new(schema, "id\n1\n".as_bytes(), HeaderMode::FromInput).unwrap();
        assert_eq!(decoder.shape(), &["id"]);
    }

    #[test]
    fn test_invalid_utf8_is_row_level() {
        let schema = lookup("departments").unwrap();
        let input: &[u8] = b"1,Sales\n2,\xff\xfe\n3,Eng\n";
        let rows: Vec<_> = CsvDecoder::new(schema, input, HeaderMode::Headerless)
            .unwrap()
            .rows()
            .collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert!(matches!(
            &rows[1],
            Err(RowDecodeError::Rejected(RowRejection {
                reason: RejectReason::Malformed { .. },
                ..
            }))
        ));
        assert!(rows[2].is_ok());
    }
}
