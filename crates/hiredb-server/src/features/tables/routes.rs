//! Table listing routes
//!
//! - `GET /api/v1/departments`
//! - `GET /api/v1/jobs`
//! - `GET /api/v1/hired_employees`
//!
//! All three accept `page` (default 1) and `per_page` (default 50, max 500)
//! and return rows ordered by id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;

use super::queries::{ListRowsError, ListRowsQuery};
use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::shared::PaginationParams;

pub fn tables_routes() -> Router<PgPool> {
    Router::new().route("/:table_name", get(list_rows))
}

impl From<ListRowsError> for AppError {
    fn from(err: ListRowsError) -> Self {
        match err {
            ListRowsError::UnknownTable(e) => AppError::Hiredb(e),
            ListRowsError::InvalidPagination(message) => AppError::Validation(message.to_string()),
            ListRowsError::Database(e) => AppError::Database(e),
        }
    }
}

#[tracing::instrument(
    skip(pool, pagination),
    fields(table = %table_name, page = ?pagination.page, per_page = ?pagination.per_page)
)]
async fn list_rows(
    State(pool): State<PgPool>,
    Path(table_name): Path<String>,
    Query(pagination): Query<PaginationParams>,
) -> Result<Response, AppError> {
    let query = ListRowsQuery {
        table_name,
        pagination,
    };
    let response = super::queries::list::handle(pool, query).await?;

    tracing::debug!(
        count = response.items.len(),
        total = response.pagination.total,
        "Rows listed via API"
    );

    let meta = json!({ "pagination": response.pagination });

    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(response.items, meta))).into_response())
}
