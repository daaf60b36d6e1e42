//! StateSet Insights
//!
//! Stateless analytics service: demand forecasting, price optimization,
//! RFM customer segmentation and seasonality reports over HTTP.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod middleware_helpers;
pub mod ml;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, OriginalUri, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::AppConfig;
use crate::health::HealthState;
use crate::services::AnalyticsServices;

pub const SERVICE_NAME: &str = "stateset-insights";

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: AnalyticsServices,
    pub health: Arc<HealthState>,
}

impl AppState {
    /// Build the services and health state from the loaded configuration
    pub fn new(config: AppConfig) -> Self {
        let services = AnalyticsServices::new(&config.forecasting);
        let health = Arc::new(HealthState::new(
            services.forecasting.seasonal_engine_enabled(),
        ));
        Self {
            config: Arc::new(config),
            services,
            health,
        }
    }

    pub fn seasonal_engine_available(&self) -> bool {
        self.services.forecasting.seasonal_engine_enabled()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}


/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Analytic endpoints, mounted under `/api/v1`
pub fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .merge(handlers::forecasting::forecast_routes())
        .merge(handlers::pricing::pricing_routes())
        .merge(handlers::segmentation::segmentation_routes())
        .merge(handlers::seasonality::seasonality_routes())
}

/// Full application router with per-request middleware applied.
///
/// CORS, compression and the request timeout are left to the binary.
pub fn app_router(state: AppState) -> Router {
    let max_body_size = state.config.max_body_size;

    Router::new()
        .route("/", get(service_banner))
        .nest("/api/v1", api_v1_routes())
        .route_layer(axum::middleware::from_fn(metrics::track_http_metrics))
        .nest("/health", health::health_routes(state.health.clone()))
        .route("/metrics", get(metrics::metrics_handler))
        .route("/metrics/json", get(metrics::metrics_json_handler))
        .merge(openapi::swagger_ui())
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(crate::tracing::configure_http_tracing())
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn route_not_found(OriginalUri(uri): OriginalUri) -> errors::ServiceError {
    errors::ServiceError::NotFound(format!("no route for {}", uri.path()))
}

async fn service_banner(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "status": "ready",
        "seasonal_engine_available": state.seasonal_engine_available(),
    }))
}

/// Payload of `GET /api/v1/status`
#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceStatus {
    #[schema(example = "ok")]
    pub status: String,
    pub service: String,
    pub version: String,
    pub git: String,
    pub environment: String,
    pub seasonal_engine_available: bool,
    pub max_forecast_days: u32,
    pub timestamp: String,
}

/// Service status, version and engine availability
#[utoipa::path(
    get,
    path = "/api/v1/status",
    responses(
        (status = 200, description = "Service status", body = ApiResponse<ServiceStatus>)
    ),
    tag = "Health"
)]
pub async fn api_status(State(state): State<AppState>) -> ApiResult<ServiceStatus> {
    let status = ServiceStatus {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        git: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        environment: state.config.environment.clone(),
        seasonal_engine_available: state.seasonal_engine_available(),
        max_forecast_days: state.config.forecasting.max_forecast_days,
        timestamp: Utc::now().to_rfc3339(),
    };

    Ok(Json(ApiResponse::success(status)))
}
