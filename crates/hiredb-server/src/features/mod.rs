//! Feature modules implementing the hiredb API
//!
//! # Features
//!
//! - **upload**: CSV upload into one of the three tables
//! - **tables**: paginated listing of departments, jobs and hired employees
//!
//! Each feature keeps its write operations in `commands/`, its reads in
//! `queries/`, and its HTTP wiring in `routes.rs`.

pub mod shared;
pub mod tables;
pub mod upload;

use axum::Router;

use crate::config::IngestSettings;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub db: sqlx::PgPool,
    /// Batch size and default verbosity for uploads
    pub ingest: IngestSettings,
}

/// Creates the API router with all feature routes mounted
///
/// - `/upload/:table_name` - CSV upload
/// - `/:table_name` - table listing
pub fn router(state: FeatureState) -> Router<()> {
    Router::new()
        .nest("/upload", upload::upload_routes().with_state(state.clone()))
        .merge(tables::tables_routes().with_state(state.db))
}
