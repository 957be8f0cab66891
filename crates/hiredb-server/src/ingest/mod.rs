//! CSV ingestion pipeline
//!
//! Loads headerless (or, for uploads, header-carrying) CSV files into the
//! `departments`, `jobs` and `hired_employees` tables.
//!
//! # Architecture
//!
//! - **schema**: static registry of the three tables, their columns and coercions
//! - **decoder**: lazy CSV decoding into typed, possibly-missing fields
//! - **validator**: drops incomplete rows and turns the rest into [`Record`]s
//! - **sink**: the storage seam ([`RecordSink`]) and its PostgreSQL implementation
//! - **loader**: chunked, one-transaction-per-chunk writes with progress events
//! - **orchestrator**: [`Ingestor`], the entry point shared by the upload endpoint
//!   and the `hiredb-load` binary
//!
//! There is no transaction spanning a whole file. When chunk `n` fails, chunks
//! `0..n` stay committed and the error names the failing chunk.
//!
//! [`Record`]: hiredb_common::types::Record

pub mod decoder;
pub mod loader;
pub mod orchestrator;
pub mod schema;
pub mod sink;
pub mod validator;

#[cfg(test)]
pub(crate) mod testing;

pub use decoder::{CsvDecoder, DecodedRow, Field, HeaderMode, RowDecodeError, Value};
pub use loader::{BatchLoader, BatchProgress, LoadObserver, LoadReport, TracingObserver};
pub use orchestrator::{Diagnostics, IngestOptions, IngestSummary, Ingestor};
pub use schema::{lookup, ColumnKind, ColumnSpec, TableSchema};
pub use sink::{ConflictPolicy, ConstraintKind, PgRecordSink, RecordSink, SinkError};
pub use validator::{validate, RejectReason, RowRejection, Validated};

/// Rows per transaction unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Upper bound on rows per transaction
///
/// The widest table binds five parameters per row and PostgreSQL accepts at
/// most 65535 bind parameters per statement.
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors surfaced by [`Ingestor::ingest`]
///
/// `UnknownTable` and `MissingColumns` are structural and happen before any
/// write. `ChunkWriteFailed` happens after `index` chunks were committed.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    #[error("Failed to write chunk {index}: {source}")]
    ChunkWriteFailed {
        index: usize,
        #[source]
        source: SinkError,
    },

    #[error("Failed to read CSV input: {0}")]
    Read(#[source] std::io::Error),

    #[error("Batch size must be between 1 and {MAX_BATCH_SIZE}, got {0}")]
    InvalidBatchSize(usize),
}

impl IngestError {
    /// Whether the caller sent something unusable, as opposed to a storage failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            IngestError::UnknownTable(_)
                | IngestError::MissingColumns(_)
                | IngestError::InvalidBatchSize(_)
        )
    }
}
