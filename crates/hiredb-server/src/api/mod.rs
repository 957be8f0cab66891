pub mod response;

use crate::config::Config;
use crate::db;
use crate::features;
use crate::middleware;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use sqlx::PgPool;

/// Build the application router with all routes and middleware
pub fn create_router(db: PgPool, config: &Config) -> Router {
    let feature_state = features::FeatureState {
        db: db.clone(),
        ingest: config.ingest.clone(),
    };

    Router::new()
        .route("/ping", get(ping))
        .route("/health", get(health))
        .with_state(db)
        .nest("/api/v1", features::router(feature_state))
        .layer(middleware::tracing_layer())
        .layer(middleware::cors_layer(&config.cors))
}

async fn ping() -> impl IntoResponse {
    Json(json!({ "message": "API is running!" }))
}

async fn health(State(db): State<PgPool>) -> Response {
    match db::health_check(&db).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "database": "connected"
            })),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Database health check failed: {:?}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "database": "unreachable"
                })),
            )
                .into_response()
        },
    }
}
