//! Storage seam for the batch loader
//!
//! [`RecordSink::write_batch`] writes one chunk inside one transaction. The
//! PostgreSQL implementation issues a single multi-row `INSERT`.

use async_trait::async_trait;
use hiredb_common::types::{Record, TableName};
use serde::{Deserialize, Serialize};
use sqlx::{error::ErrorKind, PgPool, Postgres, QueryBuilder};
use tracing::debug;

/// What to do when a row's primary key already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictPolicy {
    /// `ON CONFLICT (id) DO NOTHING`: existing rows win, re-runs are no-ops
    Ignore,
    /// Plain `INSERT`: a duplicate id fails the whole chunk
    Reject,
}

/// Class of a violated constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    Unique,
    ForeignKey,
    NotNull,
    Check,
}

/// Failure of a single batch write
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The data broke a database constraint
    #[error("{kind:?} constraint violation{}: {message}", on_constraint(.constraint))]
    Constraint {
        kind: ConstraintKind,
        constraint: Option<String>,
        message: String,
    },

    /// The database could not be reached or the connection dropped
    #[error("Storage unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),

    #[error("Database error: {0}")]
    Database(#[source] sqlx::Error),

    #[error("Batch for {expected} contains a {found} record")]
    TableMismatch { expected: TableName, found: TableName },
}

fn on_constraint(constraint: &Option<String>) -> String {
    constraint
        .as_deref()
        .map(|c| format!(" on {c}"))
        .unwrap_or_default()
}

impl SinkError {
    pub fn is_constraint(&self) -> bool {
        matches!(self, SinkError::Constraint { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, SinkError::Unavailable(_))
    }
}

impl From<sqlx::Error> for SinkError {
    fn from(err: sqlx::Error) -> Self {
        let violation = match &err {
            sqlx::Error::Database(db) => {
                let kind = match db.kind() {
                    ErrorKind::UniqueViolation => Some(ConstraintKind::Unique),
                    ErrorKind::ForeignKeyViolation => Some(ConstraintKind::ForeignKey),
                    ErrorKind::NotNullViolation => Some(ConstraintKind::NotNull),
                    ErrorKind::CheckViolation => Some(ConstraintKind::Check),
                    _ => None,
                };
                kind.map(|kind| SinkError::Constraint {
                    kind,
                    constraint: db.constraint().map(str::to_string),
                    message: db.message().to_string(),
                })
            },
            _ => None,
        };

        if let Some(violation) = violation {
            return violation;
        }

        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => SinkError::Unavailable(err),
            other => SinkError::Database(other),
        }
    }
}

/// Destination for validated records
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Write `records` (all belonging to `table`) atomically
    ///
    /// Returns the number of rows actually inserted, which is lower than
    /// `records.len()` when [`ConflictPolicy::Ignore`] skipped existing ids.
    async fn write_batch(
        &self,
        table: TableName,
        records: &[Record],
        policy: ConflictPolicy,
    ) -> Result<u64, SinkError>;
}

/// PostgreSQL-backed sink
///
/// The pool is owned by the caller; the sink only borrows connections from it.
#[derive(Clone)]
pub struct PgRecordSink {
    pool: PgPool,
}

impl PgRecordSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordSink for PgRecordSink {
    async fn write_batch(
        &self,
        table: TableName,
        records: &[Record],
        policy: ConflictPolicy,
    ) -> Result<u64, SinkError> {
        if records.is_empty() {
            return Ok(0);
        }

        if let Some(other) = records.iter().find(|r| r.table() != table) {
            return Err(SinkError::TableMismatch {
                expected: table,
                found: other.table(),
            });
        }

        let mut query_builder = insert_statement(table, records);
        if policy == ConflictPolicy::Ignore {
            query_builder.push(" ON CONFLICT (id) DO NOTHING");
        }

        // Dropping `tx` on any error path rolls the chunk back
        let mut tx = self.pool.begin().await?;
        let result = query_builder.build().execute(&mut *tx).await?;
        tx.commit().await?;

        debug!(
            table = %table,
            rows = records.len(),
            inserted = result.rows_affected(),
            ?policy,
            "Batch committed"
        );

        Ok(result.rows_affected())
    }
}

/// Build the multi-row `INSERT` for one chunk
fn insert_statement(table: TableName, records: &[Record]) -> QueryBuilder<'_, Postgres> {
    match table {
        TableName::Departments => {
            let mut qb = QueryBuilder::new("INSERT INTO departments (id, name) ");
            qb.push_values(
                records.iter().filter_map(|r| match r {
                    Record::Department(d) => Some(d),
                    _ => None,
                }),
                |mut b, d| {
                    b.push_bind(d.id).push_bind(&d.name);
                },
            );
            qb
        },
        TableName::Jobs => {
            let mut qb = QueryBuilder::new("INSERT INTO jobs (id, name) ");
            qb.push_values(
                records.iter().filter_map(|r| match r {
                    Record::Job(j) => Some(j),
                    _ => None,
                }),
                |mut b, j| {
                    b.push_bind(j.id).push_bind(&j.name);
                },
            );
            qb
        },
        TableName::HiredEmployees => {
            let mut qb = QueryBuilder::new(
                "INSERT INTO hired_employees (id, name, hire_timestamp, department_id, job_id) ",
            );
            qb.push_values(
                records.iter().filter_map(|r| match r {
                    Record::HiredEmployee(e) => Some(e),
                    _ => None,
                }),
                |mut b, e| {
                    b.push_bind(e.id)
                        .push_bind(&e.name)
                        .push_bind(e.hire_timestamp)
                        .push_bind(e.department_id)
                        .push_bind(e.job_id);
                },
            );
            qb
        },
    }
}
