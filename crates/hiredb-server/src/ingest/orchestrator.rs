//! Ingestion entry point
//!
//! [`Ingestor::ingest`] runs the whole pipeline for one CSV stream:
//! schema lookup, decoding, validation, then chunked loading. Structural
//! failures (unknown table, missing columns) are raised before anything is
//! written.

use hiredb_common::types::TableName;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

use super::decoder::{CsvDecoder, HeaderMode};
use super::loader::{BatchLoader, LoadObserver};
use super::schema::lookup;
use super::sink::{ConflictPolicy, RecordSink};
use super::validator::{validate, RowRejection};
use super::{IngestError, Result, DEFAULT_BATCH_SIZE};

/// How much detail dropped rows get in the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Diagnostics {
    /// Count dropped rows only
    #[default]
    Terse,
    /// Also keep line number and reason for each dropped row
    Verbose,
}

/// Knobs for one ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestOptions {
    pub batch_size: usize,
    pub header: HeaderMode,
    pub conflict_policy: ConflictPolicy,
    pub diagnostics: Diagnostics,
}

impl IngestOptions {
    /// Bulk loading of headerless files; re-runs are no-ops
    pub fn batch() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            header: HeaderMode::Headerless,
            conflict_policy: ConflictPolicy::Ignore,
            diagnostics: Diagnostics::Terse,
        }
    }

    /// Uploads through the HTTP endpoint: header row expected, duplicates fail
    pub fn upload() -> Self {
        Self {
            header: HeaderMode::FromInput,
            conflict_policy: ConflictPolicy::Reject,
            ..Self::batch()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_header(mut self, header: HeaderMode) -> Self {
        self.header = header;
        self
    }

    pub fn with_conflict_policy(mut self, policy: ConflictPolicy) -> Self {
        self.conflict_policy = policy;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Diagnostics) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::batch()
    }
}

/// Outcome of a successful ingestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub table: TableName,
    pub rows_read: usize,
    /// Rows inserted; lower than the valid row count when existing ids were skipped
    pub rows_written: u64,
    pub rows_rejected: usize,
    pub batches: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejections: Option<Vec<RowRejection>>,
}

/// Runs CSV streams through the ingestion pipeline into a [`RecordSink`]
pub struct Ingestor {
    sink: Arc<dyn RecordSink>,
    options: IngestOptions,
    observer: Option<Arc<dyn LoadObserver>>,
}

impl Ingestor {
    pub fn new(sink: Arc<dyn RecordSink>, options: IngestOptions) -> Self {
        Self {
            sink,
            options,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn LoadObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Ingest one CSV stream into `table_name`
    ///
    /// The stream is fully decoded and validated before the first chunk is
    /// written. Each chunk commits on its own; on
    /// [`IngestError::ChunkWriteFailed`](super::IngestError::ChunkWriteFailed)
    /// the preceding chunks remain in the table.
    #[instrument(skip(self, reader), fields(batch_size = self.options.batch_size))]
    pub async fn ingest<R: Read + Send>(
        &self,
        table_name: &str,
        reader: R,
    ) -> Result<IngestSummary> {
        let schema = lookup(table_name)?;
        let mut loader = BatchLoader::new(
            self.sink.clone(),
            self.options.batch_size,
            self.options.conflict_policy,
        )?;
        if let Some(observer) = &self.observer {
            loader = loader.with_observer(observer.clone());
        }

        let validated = {
            let decoder = CsvDecoder::new(schema, reader, self.options.header)?;
            let shape = decoder.shape().to_vec();
            validate(schema, &shape, decoder.rows(), self.options.diagnostics)?
        };

        info!(
            table = %schema.table,
            rows_read = validated.rows_read,
            valid = validated.records.len(),
            rejected = validated.rejected,
            "Validated CSV input"
        );

        let report = loader.load(schema.table, &validated.records).await?;

        info!(
            table = %schema.table,
            rows_written = report.rows_written,
            batches = report.batches,
            "Ingestion complete"
        );

        let rejections = match self.options.diagnostics {
            Diagnostics::Verbose => Some(validated.rejections),
            Diagnostics::Terse => None,
        };

        Ok(IngestSummary {
            table: schema.table,
            rows_read: validated.rows_read,
            rows_written: report.rows_written,
            rows_rejected: validated.rejected,
            batches: report.batches,
            rejections,
        })
    }

    /// Ingest the CSV file at `path` into `table_name`
    ///
    /// The file is read through `tokio::fs`, so the runtime's workers never
    /// block on disk I/O; decoding then runs over the in-memory bytes.
    pub async fn ingest_file(&self, table_name: &str, path: &Path) -> Result<IngestSummary> {
        // Unknown tables are reported before the file is opened
        lookup(table_name)?;

        let content = tokio::fs::read(path).await.map_err(|e| {
            IngestError::Read(std::io::Error::new(
                e.kind(),
                format!("{}: {}", path.display(), e),
            ))
        })?;
        info!(
            table = table_name,
            path = %path.display(),
            bytes = content.len(),
            "Loading CSV file"
        );

        self.ingest(table_name, content.as_slice()).await
    }

    /// Load `<table>.csv` for every table in `dir`, dimensions first
    ///
    /// Stops at the first table that fails; tables loaded before it stay loaded.
    pub async fn ingest_dir(&self, dir: &Path) -> Result<Vec<IngestSummary>> {
        let mut summaries = Vec::with_capacity(TableName::all().len());
        for table in TableName::all() {
            let path = dir.join(table.file_name());
            summaries.push(self.ingest_file(table.as_str(), &path).await?);
        }
        Ok(summaries)
    }
}
