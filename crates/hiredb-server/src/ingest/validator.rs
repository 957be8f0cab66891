//! Record validator
//!
//! Checks the decoded shape once, then drops every row with a missing or
//! invalid required field. Dropped rows are counted, not reported as errors.

use hiredb_common::types::{Department, HiredEmployee, Job, Record, TableName};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

use super::decoder::{DecodedRow, Field, RowDecodeError, Value};
use super::orchestrator::Diagnostics;
use super::schema::TableSchema;
use super::{IngestError, Result};

/// Why a row was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// A required column was empty, absent, or (for timestamps) unparseable
    MissingField { column: String },
    InvalidInteger { column: String, value: String },
    FieldCount { expected: usize, found: usize },
    Malformed { message: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingField { column } => write!(f, "missing value for '{}'", column),
            RejectReason::InvalidInteger { column, value } => {
                write!(f, "'{}' is not a whole number in column '{}'", value, column)
            },
            RejectReason::FieldCount { expected, found } => {
                write!(f, "expected {} fields, found {}", expected, found)
            },
            RejectReason::Malformed { message } => write!(f, "malformed record: {}", message),
        }
    }
}

/// A dropped row and the reason it was dropped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowRejection {
    pub line: u64,
    pub reason: RejectReason,
}

impl fmt::Display for RowRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Output of [`validate`]
#[derive(Debug, Default)]
pub struct Validated {
    pub records: Vec<Record>,
    /// Rows seen, valid or not
    pub rows_read: usize,
    pub rejected: usize,
    /// Per-row reasons, only filled with [`Diagnostics::Verbose`]
    pub rejections: Vec<RowRejection>,
}

impl Validated {
    fn reject(&mut self, rejection: RowRejection, diagnostics: Diagnostics) {
        self.rejected += 1;
        if diagnostics == Diagnostics::Verbose {
            debug!(line = rejection.line, reason = %rejection.reason, "Row rejected");
            self.rejections.push(rejection);
        }
    }
}

/// Columns of `schema` absent from `shape`, in schema order
pub fn missing_columns(schema: &TableSchema, shape: &[String]) -> Vec<String> {
    schema
        .columns
        .iter()
        .filter(|c| !shape.iter().any(|s| s == c.name))
        .map(|c| c.name.to_string())
        .collect()
}

/// Validate decoded rows against `schema`
///
/// Fails with [`IngestError::MissingColumns`] before touching `rows` when the
/// shape lacks a required column. A stream I/O error aborts with
/// [`IngestError::Read`]; every other problem only drops the row.
pub fn validate<I>(
    schema: &TableSchema,
    shape: &[String],
    rows: I,
    diagnostics: Diagnostics,
) -> Result<Validated>
where
    I: IntoIterator<Item = std::result::Result<DecodedRow, RowDecodeError>>,
{
    let missing = missing_columns(schema, shape);
    if !missing.is_empty() {
        warn!(table = %schema.table, ?missing, "Input is missing required columns");
        return Err(IngestError::MissingColumns(missing));
    }

    let mut out = Validated::default();

    for row in rows {
        out.rows_read += 1;
        match row {
            Ok(row) => match build_record(schema, row) {
                Ok(record) => out.records.push(record),
                Err(rejection) => out.reject(rejection, diagnostics),
            },
            Err(RowDecodeError::Rejected(rejection)) => out.reject(rejection, diagnostics),
            Err(RowDecodeError::Io(err)) => return Err(IngestError::Read(err)),
        }
    }

    if out.rejected > 0 {
        debug!(
            table = %schema.table,
            rows_read = out.rows_read,
            rejected = out.rejected,
            "Dropped rows with missing or invalid fields"
        );
    }

    Ok(out)
}

/// Check every required column, then assemble the typed record
fn build_record(
    schema: &TableSchema,
    mut row: DecodedRow,
) -> std::result::Result<Record, RowRejection> {
    let line = row.line;
    let mut values = Vec::with_capacity(schema.columns.len());

    for column in schema.columns {
        match row.take(column.name) {
            Field::Present(value) => values.push(value),
            Field::Missing => {
                return Err(RowRejection {
                    line,
                    reason: RejectReason::MissingField {
                        column: column.name.to_string(),
                    },
                })
            },
            Field::Invalid(value) => {
                return Err(RowRejection {
                    line,
                    reason: RejectReason::InvalidInteger {
                        column: column.name.to_string(),
                        value,
                    },
                })
            },
        }
    }

    let malformed = || RowRejection {
        line,
        reason: RejectReason::Malformed {
            message: format!("values do not match the {} schema", schema.table),
        },
    };

    let record = match (schema.table, values.as_mut_slice()) {
        (TableName::Departments, [Value::Integer(id), Value::Text(name)]) => {
            Record::Department(Department {
                id: *id,
                name: std::mem::take(name),
            })
        },
        (TableName::Jobs, [Value::Integer(id), Value::Text(name)]) => Record::Job(Job {
            id: *id,
            name: std::mem::take(name),
        }),
        (
            TableName::HiredEmployees,
            [
                Value::Integer(id),
                Value::Text(name),
                Value::Timestamp(hire_timestamp),
                Value::Integer(department_id),
                Value::Integer(job_id),
            ],
        ) => Record::HiredEmployee(HiredEmployee {
            id: *id,
            name: std::mem::take(name),
            hire_timestamp: *hire_timestamp,
            department_id: *department_id,
            job_id: *job_id,
        }),
        _ => return Err(malformed()),
    };

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::decoder::{CsvDecoder, HeaderMode};
    use crate::ingest::schema::lookup;

    fn run(
        table: &str,
        input: &str,
        mode: HeaderMode,
        diagnostics: Diagnostics,
    ) -> Result<Validated> {
        let schema = lookup(table).unwrap();
        let decoder = CsvDecoder::new(schema, input.as_bytes(), mode)?;
        let shape = decoder.shape().to_vec();
        validate(schema, &shape, decoder.rows(), diagnostics)
    }

    #[test]
    fn test_valid_departments() {
        let input = "1,Sales\n2,Eng\n";
        let out = run("departments", input, HeaderMode::Headerless, Diagnostics::Terse).unwrap();
        assert_eq!(out.rows_read, 2);
        assert_eq!(out.rejected, 0);
        assert_eq!(
            out.records,
            vec![
                Record::Department(Department { id: 1, name: "Sales".into() }),
                Record::Department(Department { id: 2, name: "Eng".into() }),
            ]
        );
    }

    #[test]
    fn test_unparseable_timestamps_are_dropped_and_counted() {
        let input = "\
1,Harold,2021-11-07T02:48:42Z,2,96
2,Ty,not-a-date,3,52
3,Lyman,2021-05-30T05:43:46Z,2,92
4,Lewis,,4,69
";
        let out =
            run("hired_employees", input, HeaderMode::Headerless, Diagnostics::Terse).unwrap();
        assert_eq!(out.rows_read, 4);
        assert_eq!(out.rejected, 2);
        assert_eq!(out.records.len(), out.rows_read - 2);
        assert!(out.rejections.is_empty(), "terse mode keeps no per-row detail");
    }

    #[test]
    fn test_verbose_diagnostics_record_reasons() {
        let input = "\
1,Harold,2021-11-07T02:48:42Z,,96
2,Ty,2021-11-07T02:48:42Z,x,52
3,Lyman
4,Lewis,bad,1,1
";
        let out =
            run("hired_employees", input, HeaderMode::Headerless, Diagnostics::Verbose).unwrap();
        assert_eq!(out.records.len(), 0);
        assert_eq!(out.rejected, 4);
        assert_eq!(
            out.rejections,
            vec![
                RowRejection {
                    line: 1,
                    reason: RejectReason::MissingField { column: "department_id".into() },
                },
                RowRejection {
                    line: 2,
                    reason: RejectReason::InvalidInteger {
                        column: "department_id".into(),
                        value: "x".into(),
                    },
                },
                RowRejection {
                    line: 3,
                    reason: RejectReason::FieldCount { expected: 5, found: 2 },
                },
                RowRejection {
                    line: 4,
                    reason: RejectReason::MissingField { column: "hire_timestamp".into() },
                },
            ]
        );
        assert_eq!(
            out.rejections[1].to_string(),
            "line 2: 'x' is not a whole number in column 'department_id'"
        );
    }

    #[test]
    fn test_empty_name_passes() {
        let out = run("jobs", "1,\n", HeaderMode::Headerless, Diagnostics::Terse).unwrap();
        assert_eq!(out.records, vec![Record::Job(Job { id: 1, name: String::new() })]);
    }

    #[test]
    fn test_missing_columns_fail_before_rows() {
        let err = run(
            "hired_employees",
            "id,name,department_id\n1,Ana,2\n",
            HeaderMode::FromInput,
            Diagnostics::Terse,
        )
        .unwrap_err();

        match err {
            IngestError::MissingColumns(columns) => {
                assert_eq!(columns, vec!["hire_timestamp".to_string(), "job_id".to_string()]);
            },
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_columns_does_not_consume_rows() {
        let schema = lookup("departments").unwrap();
        let shape = vec!["id".to_string()];
        let mut consumed = 0;
        let rows = std::iter::from_fn(|| {
            consumed += 1;
            None::<std::result::Result<DecodedRow, RowDecodeError>>
        });

        let result = validate(schema, &shape, rows, Diagnostics::Terse);
        assert!(matches!(result, Err(IngestError::MissingColumns(_))));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_io_error_aborts() {
        let schema = lookup("departments").unwrap();
        let shape = vec!["id".to_string(), "name".to_string()];
        let rows = vec![Err(RowDecodeError::Io(std::io::Error::other("connection reset")))];

        let result = validate(schema, &shape, rows, Diagnostics::Terse);
        assert!(matches!(result, Err(IngestError::Read(_))));
    }

    #[test]
    fn test_header_with_legacy_names() {
        let input = "id,datetime,name,department_id,job_id\n7,2021-07-27T16:02:08Z,Marcelo,1,2\n";
        let out = run("hired_employees", input, HeaderMode::FromInput, Diagnostics::Terse).unwrap();
        match &out.records[..] {
            [Record::HiredEmployee(e)] => {
                assert_eq!(e.id, 7);
                assert_eq!(e.name, "Marcelo");
                assert_eq!(e.department_id, 1);
                assert_eq!(e.job_id, 2);
            },
            other => panic!("unexpected records: {other:?}"),
        }
    }
}
