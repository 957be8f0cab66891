//! Upload API routes
//!
//! - `POST /api/v1/upload/:table_name` - Load a CSV file into one table
//!
//! The file is sent as the multipart field `file`. Query parameters:
//! `header` (default `true`) says whether the first line names the columns,
//! `verbose` adds per-row rejection reasons to the summary.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use super::commands::{IngestCsvCommand, IngestCsvError};
use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;

/// Largest accepted request body
pub const UPLOAD_BODY_LIMIT: usize = 64 * 1024 * 1024;

pub fn upload_routes() -> Router<FeatureState> {
    Router::new()
        .route("/:table_name", post(upload_csv))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
}

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
    pub header: Option<bool>,
    pub verbose: Option<bool>,
}

impl From<IngestCsvError> for AppError {
    fn from(err: IngestCsvError) -> Self {
        match err {
            IngestCsvError::EmptyFile => AppError::Validation(err.to_string()),
            IngestCsvError::Ingest(e) => AppError::Ingest(e),
        }
    }
}

/// Load an uploaded CSV file
///
/// # Response
///
/// - `201 Created` - Summary of rows read, written and rejected
/// - `400 Bad Request` - Unknown table, missing columns, or no usable file
/// - `500 Internal Server Error` - A chunk violated a constraint or the file could not be read
/// - `503 Service Unavailable` - The database could not be reached mid-load
#[tracing::instrument(skip(state, params, multipart), fields(table = %table_name))]
async fn upload_csv(
    State(state): State<FeatureState>,
    Path(table_name): Path<String>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut content: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to read multipart field: {}", e)))?
    {
        if field.name() == Some("file") {
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read file bytes: {}", e)))?;
            content = Some(data.to_vec());
        }
    }

    let content = content
        .ok_or_else(|| AppError::Validation("No file field found in multipart data".to_string()))?;

    let command = IngestCsvCommand {
        table_name,
        header: params.header,
        verbose: params.verbose,
        content,
    };

    let summary = super::commands::ingest_csv::handle(state.db, &state.ingest, command).await?;

    tracing::info!(
        table = %summary.table,
        rows_read = summary.rows_read,
        rows_written = summary.rows_written,
        rows_rejected = summary.rows_rejected,
        "CSV uploaded via API"
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(summary))).into_response())
}
