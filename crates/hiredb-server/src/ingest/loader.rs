//! Batch loader
//!
//! Splits validated records into fixed-size chunks and hands each chunk to the
//! [`RecordSink`] as its own transaction. Loading stops at the first failed
//! chunk; earlier chunks stay committed.

use hiredb_common::types::{Record, TableName};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::sink::{ConflictPolicy, RecordSink};
use super::{IngestError, Result, MAX_BATCH_SIZE};

/// Progress event emitted after a full chunk commits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchProgress {
    pub table: TableName,
    /// Zero-based chunk index
    pub index: usize,
    /// Rows in the chunk
    pub size: usize,
    /// Rows actually inserted (conflicts skipped under `Ignore` are not counted)
    pub written: u64,
}

/// Receives progress events from [`BatchLoader`]
pub trait LoadObserver: Send + Sync {
    fn batch_completed(&self, progress: &BatchProgress);
}

/// Logs every progress event at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LoadObserver for TracingObserver {
    fn batch_completed(&self, progress: &BatchProgress) {
        info!(
            table = %progress.table,
            batch = progress.index + 1,
            size = progress.size,
            written = progress.written,
            "Inserted batch of {} records",
            progress.size
        );
    }
}

/// Totals for one [`BatchLoader::load`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub rows_written: u64,
    pub batches: usize,
}

pub struct BatchLoader {
    sink: Arc<dyn RecordSink>,
    batch_size: usize,
    policy: ConflictPolicy,
    observer: Option<Arc<dyn LoadObserver>>,
}

impl BatchLoader {
    /// Create a loader; `batch_size` must be within `1..=MAX_BATCH_SIZE`
    pub fn new(
        sink: Arc<dyn RecordSink>,
        batch_size: usize,
        policy: ConflictPolicy,
    ) -> Result<Self> {
        if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
            return Err(IngestError::InvalidBatchSize(batch_size));
        }

        Ok(Self {
            sink,
            batch_size,
            policy,
            observer: None,
        })
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Write `records` chunk by chunk
    ///
    /// Only chunks holding exactly `batch_size` rows are reported to the
    /// observer; a trailing partial chunk is written silently.
    pub async fn load(&self, table: TableName, records: &[Record]) -> Result<LoadReport> {
        let mut report = LoadReport::default();

        for (index, chunk) in records.chunks(self.batch_size).enumerate() {
            let written = match self.sink.write_batch(table, chunk, self.policy).await {
                Ok(written) => written,
                Err(source) => {
                    warn!(
                        table = %table,
                        chunk = index,
                        committed = report.batches,
                        error = %source,
                        "Chunk write failed, stopping load"
                    );
                    return Err(IngestError::ChunkWriteFailed { index, source });
                },
            };

            report.rows_written += written;
            report.batches += 1;

            if chunk.len() == self.batch_size {
                if let Some(observer) = &self.observer {
                    observer.batch_completed(&BatchProgress {
                        table,
                        index,
                        size: chunk.len(),
                        written,
                    });
                }
            }
        }

        Ok(report)
    }
}
