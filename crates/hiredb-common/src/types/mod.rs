//! Domain types for the hiring star schema
//!
//! `hired_employees` is the fact table; `departments` and `jobs` are the
//! dimension tables it references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::HiredbError;

/// One of the three tables the dataset is made of
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    Departments,
    Jobs,
    HiredEmployees,
}

impl TableName {
    /// All tables, dimensions first so foreign keys resolve when loaded in order
    pub const fn all() -> [TableName; 3] {
        [TableName::Departments, TableName::Jobs, TableName::HiredEmployees]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TableName::Departments => "departments",
            TableName::Jobs => "jobs",
            TableName::HiredEmployees => "hired_employees",
        }
    }

    /// Resolve a table from its SQL name; matching is exact
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|table| table.as_str() == name)
    }

    /// Conventional CSV file name for the bulk loader
    pub fn file_name(self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl std::str::FromStr for TableName {
    type Err = HiredbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| HiredbError::UnknownTable(s.to_string()))
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A department (dimension)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Department {
    pub id: i32,
    pub name: String,
}

/// A job position (dimension)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Job {
    pub id: i32,
    pub name: String,
}

/// A hiring event (fact)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HiredEmployee {
    pub id: i32,
    pub name: String,
    pub hire_timestamp: DateTime<Utc>,
    pub department_id: i32,
    pub job_id: i32,
}

/// A validated row for any of the three tables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum Record {
    Department(Department),
    Job(Job),
    HiredEmployee(HiredEmployee),
}

impl Record {
    pub fn id(&self) -> i32 {
        match self {
            Record::Department(d) => d.id,
            Record::Job(j) => j.id,
            Record::HiredEmployee(e) => e.id,
        }
    }

    pub fn table(&self) -> TableName {
        match self {
            Record::Department(_) => TableName::Departments,
            Record::Job(_) => TableName::Jobs,
            Record::HiredEmployee(_) => TableName::HiredEmployees,
        }
    }
}
