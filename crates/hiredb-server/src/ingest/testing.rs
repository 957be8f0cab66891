//! In-memory [`RecordSink`] for unit tests
//!
//! Mimics the database closely enough for the pipeline tests: primary keys per
//! table, foreign keys from hired employees to departments and jobs, and
//! all-or-nothing batches.

use async_trait::async_trait;
use hiredb_common::types::{Record, TableName};
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::sink::{ConflictPolicy, ConstraintKind, RecordSink, SinkError};
use super::loader::{BatchProgress, LoadObserver};

#[derive(Default)]
pub struct MemorySink {
    rows: Mutex<BTreeMap<(TableName, i32), Record>>,
    batches: Mutex<Vec<usize>>,
    /// Fail the batch with this zero-based call index as if the connection dropped
    fail_on_call: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    /// Sizes of every batch passed to `write_batch`, failed ones included
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().clone()
    }

    pub fn count(&self, table: TableName) -> usize {
        self.rows.lock().unwrap().keys().filter(|(t, _)| *t == table).count()
    }

    pub fn ids(&self, table: TableName) -> Vec<i32> {
        self.rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(t, _)| *t == table)
            .map(|(_, id)| *id)
            .collect()
    }

    pub fn get(&self, table: TableName, id: i32) -> Option<Record> {
        self.rows.lock().unwrap().get(&(table, id)).cloned()
    }
}

fn violation(kind: ConstraintKind, message: String) -> SinkError {
    SinkError::Constraint {
        kind,
        constraint: None,
        message,
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn write_batch(
        &self,
        table: TableName,
        records: &[Record],
        policy: ConflictPolicy,
    ) -> Result<u64, SinkError> {
        let call = {
            let mut batches = self.batches.lock().unwrap();
            batches.push(records.len());
            batches.len() - 1
        };

        if self.fail_on_call == Some(call) {
            return Err(SinkError::Unavailable(sqlx::Error::PoolTimedOut));
        }

        let mut rows = self.rows.lock().unwrap();
        let mut staged: BTreeMap<(TableName, i32), Record> = BTreeMap::new();

        for record in records {
            if record.table() != table {
                return Err(SinkError::TableMismatch {
                    expected: table,
                    found: record.table(),
                });
            }

            if let Record::HiredEmployee(e) = record {
                if !rows.contains_key(&(TableName::Departments, e.department_id)) {
                    return Err(violation(
                        ConstraintKind::ForeignKey,
                        format!("department {} does not exist", e.department_id),
                    ));
                }
                if !rows.contains_key(&(TableName::Jobs, e.job_id)) {
                    return Err(violation(
                        ConstraintKind::ForeignKey,
                        format!("job {} does not exist", e.job_id),
                    ));
                }
            }

            let key = (table, record.id());
            if rows.contains_key(&key) || staged.contains_key(&key) {
                match policy {
                    ConflictPolicy::Ignore => continue,
                    ConflictPolicy::Reject => {
                        return Err(violation(
                            ConstraintKind::Unique,
                            format!("duplicate key id={}", record.id()),
                        ))
                    },
                }
            }
            staged.insert(key, record.clone());
        }

        let inserted = staged.len() as u64;
        rows.extend(staged);
        Ok(inserted)
    }
}

/// Observer that remembers every progress event
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<BatchProgress>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<BatchProgress> {
        self.events.lock().unwrap().clone()
    }
}

impl LoadObserver for RecordingObserver {
    fn batch_completed(&self, progress: &BatchProgress) {
        self.events.lock().unwrap().push(progress.clone());
    }
}
