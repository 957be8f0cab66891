//! Server-specific error types

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::api::response::ErrorResponse;
use crate::ingest::{IngestError, SinkError};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Hiredb(#[from] hiredb_common::HiredbError),
}

impl AppError {
    /// HTTP status, machine-readable code, client-facing message and details
    fn parts(&self) -> ErrorParts {
        match self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                    None,
                )
            },
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone(), None)
            },
            AppError::Ingest(e) => ingest_parts(e),
            AppError::Hiredb(hiredb_common::HiredbError::UnknownTable(table)) => (
                StatusCode::BAD_REQUEST,
                "UNKNOWN_TABLE",
                format!("Invalid table name: {table}"),
                None,
            ),
        }
    }
}

type ErrorParts = (StatusCode, &'static str, String, Option<serde_json::Value>);

fn ingest_parts(err: &IngestError) -> ErrorParts {
    match err {
        IngestError::UnknownTable(table) => (
            StatusCode::BAD_REQUEST,
            "UNKNOWN_TABLE",
            format!("Invalid table name: {table}"),
            None,
        ),
        IngestError::MissingColumns(columns) => (
            StatusCode::BAD_REQUEST,
            "MISSING_COLUMNS",
            err.to_string(),
            Some(json!({ "missing_columns": columns })),
        ),
        IngestError::InvalidBatchSize(_) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", err.to_string(), None)
        },
        IngestError::Read(e) => {
            tracing::error!("Failed to read upload: {:?}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "READ_ERROR",
                "Failed to read the uploaded file".to_string(),
                None,
            )
        },
        IngestError::ChunkWriteFailed { index, source } => {
            tracing::error!(chunk = index, error = %source, "Chunk write failed");
            let (status, code) = match source {
                SinkError::Unavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE")
                },
                SinkError::Constraint { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "CONSTRAINT_VIOLATION")
                },
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            };
            (status, code, err.to_string(), Some(json!({ "chunk": index })))
        },
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();

        let body = match details {
            Some(details) => ErrorResponse::with_details(code, message, details),
            None => ErrorResponse::new(code, message),
        };

        (status, Json(body)).into_response()
    }
}
