//! Ingest an uploaded CSV file into one table

use hiredb_common::types::TableName;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;

use crate::config::IngestSettings;
use crate::ingest::{
    Diagnostics, HeaderMode, IngestError, IngestOptions, IngestSummary, Ingestor, PgRecordSink,
    TracingObserver,
};

/// Command to load an uploaded file
///
/// `header` and `verbose` come from the query string; `None` means the
/// server default (header row expected, verbosity from `INGEST_VERBOSE`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestCsvCommand {
    pub table_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(skip)]
    pub content: Vec<u8>,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestCsvError {
    #[error("Uploaded file is empty")]
    EmptyFile,
    #[error(transparent)]
    Ingest(#[from] IngestError),
}

impl IngestCsvCommand {
    pub fn validate(&self) -> Result<(), IngestCsvError> {
        // Unknown tables are reported before the file contents
        if TableName::from_name(&self.table_name).is_none() {
            return Err(IngestError::UnknownTable(self.table_name.clone()).into());
        }
        if self.content.iter().all(u8::is_ascii_whitespace) {
            return Err(IngestCsvError::EmptyFile);
        }
        Ok(())
    }

    fn options(&self, settings: &IngestSettings) -> IngestOptions {
        let header = if self.header.unwrap_or(true) {
            HeaderMode::FromInput
        } else {
            HeaderMode::Headerless
        };
        let diagnostics = if self.verbose.unwrap_or(settings.verbose) {
            Diagnostics::Verbose
        } else {
            Diagnostics::Terse
        };

        IngestOptions::upload()
            .with_batch_size(settings.batch_size)
            .with_header(header)
            .with_diagnostics(diagnostics)
    }
}

#[tracing::instrument(
    skip(pool, settings, command),
    fields(table = %command.table_name, bytes = command.content.len())
)]
pub async fn handle(
    pool: PgPool,
    settings: &IngestSettings,
    command: IngestCsvCommand,
) -> Result<IngestSummary, IngestCsvError> {
    command.validate()?;

    let ingestor = Ingestor::new(Arc::new(PgRecordSink::new(pool)), command.options(settings))
        .with_observer(Arc::new(TracingObserver));

    Ok(ingestor.ingest(&command.table_name, command.content.as_slice()).await?)
}
