//! HTTP API - JSON routes over the core operations.
//!
//! Every response uses the [`ApiResponse`] envelope. Handlers stay thin: they
//! decode the request, call one core function and wrap the result.

/// Error to status-code mapping
pub mod error;
/// Extractors with JSON rejections
pub mod extract;
/// Response envelope
pub mod response;
/// Route handlers
pub mod routes;

pub use error::ApiError;
pub use extract::{ApiJson, ApiPath, ApiQuery};
pub use response::ApiResponse;

use crate::config::AppConfig;
use axum::{Router, extract::State, routing::get};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Result type of every handler
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    /// Connection pool
    pub db: DatabaseConnection,
    /// Loaded configuration
    pub config: Arc<AppConfig>,
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
}

async fn health(State(state): State<AppState>) -> ApiResult<Health> {
    state.db.ping().await?;
    Ok(ApiResponse::ok(Health { status: "ok" }))
}

/// Builds the application router with tracing and CORS layers.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(routes::proposals::routes())
        .merge(routes::itinerary::routes())
        .merge(routes::guests::routes())
        .merge(routes::payment_groups::routes())
        .merge(routes::reminders::routes())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
