//! Schema registry
//!
//! Maps each table name to its ordered column list and per-column coercion.
//! Column order is the CSV order for headerless files.

use hiredb_common::types::TableName;
use serde::Serialize;

use super::{IngestError, Result};

/// How a raw CSV field is coerced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Whole number; unparseable values invalidate the row
    Integer,
    /// Passed through as-is, empty strings included
    Text,
    /// Permissive date-time; unparseable values become missing
    Timestamp,
}

/// A single required column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    /// Legacy header names accepted for this column when the file has a header row
    #[serde(skip)]
    pub aliases: &'static [&'static str],
}

impl ColumnSpec {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            aliases: &[],
        }
    }

    const fn with_aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn matches(&self, header: &str) -> bool {
        self.name == header || self.aliases.contains(&header)
    }
}

/// Columns of one table, all of them required
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    pub table: TableName,
    pub columns: &'static [ColumnSpec],
}

impl TableSchema {
    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn column(&self, name: &str) -> Option<&'static ColumnSpec> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Resolve a header cell to a column by canonical name or alias
    pub fn resolve_header(&self, header: &str) -> Option<&'static ColumnSpec> {
        let header = header.trim();
        self.columns.iter().find(|c| c.matches(header))
    }
}

static DEPARTMENTS: TableSchema = TableSchema {
    table: TableName::Departments,
    columns: &[
        ColumnSpec::new("id", ColumnKind::Integer),
        ColumnSpec::new("name", ColumnKind::Text).with_aliases(&["department"]),
    ],
};

static JOBS: TableSchema = TableSchema {
    table: TableName::Jobs,
    columns: &[
        ColumnSpec::new("id", ColumnKind::Integer),
        ColumnSpec::new("name", ColumnKind::Text).with_aliases(&["job"]),
    ],
};

static HIRED_EMPLOYEES: TableSchema = TableSchema {
    table: TableName::HiredEmployees,
    columns: &[
        ColumnSpec::new("id", ColumnKind::Integer),
        ColumnSpec::new("name", ColumnKind::Text),
        ColumnSpec::new("hire_timestamp", ColumnKind::Timestamp).with_aliases(&["datetime"]),
        ColumnSpec::new("department_id", ColumnKind::Integer),
        ColumnSpec::new("job_id", ColumnKind::Integer),
    ],
};

/// Schema for a known table
pub fn schema_for(table: TableName) -> &'static TableSchema {
    match table {
        TableName::Departments => &DEPARTMENTS,
        TableName::Jobs => &JOBS,
        TableName::HiredEmployees => &HIRED_EMPLOYEES,
    }
}

/// Look up a table by the name a caller supplied
pub fn lookup(table_name: &str) -> Result<&'static TableSchema> {
    TableName::from_name(table_name)
        .map(schema_for)
        .ok_or_else(|| IngestError::UnknownTable(table_name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_tables() {
        assert_eq!(lookup("departments").unwrap().column_names(), vec!["id", "name"]);
        assert_eq!(lookup("jobs").unwrap().column_names(), vec!["id", "name"]);
        assert_eq!(
            lookup("hired_employees").unwrap().column_names(),
            vec!["id", "name", "hire_timestamp", "department_id", "job_id"]
        );
    }

    #[test]
    fn test_lookup_unknown_table() {
        let err = lookup("widgets").unwrap_err();
        assert!(matches!(err, IngestError::UnknownTable(ref name) if name == "widgets"));
        assert!(err.is_client_error());
    }

    #[test]
    fn test_column_kinds() {
        let schema = schema_for(TableName::HiredEmployees);
        assert_eq!(schema.column("hire_timestamp").unwrap().kind, ColumnKind::Timestamp);
        assert_eq!(schema.column("job_id").unwrap().kind, ColumnKind::Integer);
        assert_eq!(schema.column("name").unwrap().kind, ColumnKind::Text);
        assert!(schema.column("datetime").is_none());
    }

    #[test]
    fn test_resolve_header_aliases() {
        let employees = schema_for(TableName::HiredEmployees);
        assert_eq!(employees.resolve_header("datetime").unwrap().name, "hire_timestamp");
        assert_eq!(employees.resolve_header(" job_id ").unwrap().name, "job_id");
        assert!(employees.resolve_header("salary").is_none());

        let departments = schema_for(TableName::Departments);
        assert_eq!(departments.resolve_header("department").unwrap().name, "name");
        assert!(departments.resolve_header("job").is_none());
    }
}
