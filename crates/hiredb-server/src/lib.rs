//! hiredb server library
//!
//! Loads the hiring dataset (departments, jobs, hired employees) from CSV
//! files into PostgreSQL and serves it over HTTP.
//!
//! # Overview
//!
//! - **Ingestion** ([`ingest`]): decode, validate and batch-load CSV input
//! - **API** ([`api`], [`features`]): CSV upload and table listing endpoints
//! - **Database** ([`db`]): pool creation, migrations, health check
//! - **Configuration** ([`config`]): environment-based settings
//! - **Middleware** ([`middleware`]): CORS and request tracing
//!
//! Two binaries share this library: `hiredb-server` (the HTTP API) and
//! `hiredb-load` (bulk loading of headerless CSV files from disk).
//!
//! # Example
//!
//! ```no_run
//! use hiredb_server::{api, config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&(&config.database).into()).await?;
//!     let app = api::create_router(pool, &config);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;

pub use error::AppError;
