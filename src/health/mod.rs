/*!
 * # Health Check Module
 *
 * Endpoints for monitoring the analytics service:
 *
 * - Basic health check (`/health`) - up/degraded status and engine availability
 * - Readiness check (`/health/ready`) - whether the service accepts traffic
 * - Liveness check (`/health/live`) - whether the process is alive
 * - Detailed health check (`/health/details`) - per component status
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
    Degraded,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Up | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// Health check detail
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl HealthDetail {
    fn up() -> Self {
        Self {
            status: HealthStatus::Up,
            message: None,
            timestamp: Utc::now(),
        }
    }
}

/// Overall health information
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: BTreeMap<String, HealthDetail>,
}

/// Health check state
#[derive(Debug, Clone)]
pub struct HealthState {
    pub seasonal_engine_enabled: bool,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(seasonal_engine_enabled: bool) -> Self {
        Self {
            seasonal_engine_enabled,
            start_time: SystemTime::now(),
        }
    }

    /// Calculate system uptime
    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    /// Current status of every component
    pub fn report(&self) -> HealthInfo {
        let mut details = BTreeMap::new();

        let seasonal = if self.seasonal_engine_enabled {
            HealthDetail::up()
        } else {
            HealthDetail {
                status: HealthStatus::Degraded,
                message: Some(
                    "seasonal engine disabled; seasonal requests use the statistical model"
                        .to_string(),
                ),
                timestamp: Utc::now(),
            }
        };
        details.insert("seasonal_engine".to_string(), seasonal);
        details.insert("random_forest".to_string(), HealthDetail::up());
        details.insert("pricing".to_string(), HealthDetail::up());
        details.insert("segmentation".to_string(), HealthDetail::up());

        let status = if details.values().any(|d| d.status == HealthStatus::Down) {
            HealthStatus::Down
        } else if details.values().any(|d| d.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Up
        };

        HealthInfo {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
            uptime_seconds: self.uptime(),
            details,
        }
    }
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
        "built": option_env!("BUILD_TIME").unwrap_or("unknown"),
    }))
}

/// Basic health check endpoint
pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Health check endpoint called");
    let health = state.report();

    (
        health.status.status_code(),
        Json(json!({
            "status": health.status,
            "version": health.version,
            "timestamp": health.timestamp,
            "seasonal_engine_available": state.seasonal_engine_enabled,
        })),
    )
}

/// Readiness check endpoint
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    debug!("Readiness check endpoint called");
    let health = state.report();

    (
        health.status.status_code(),
        Json(json!({
            "ready": health.status != HealthStatus::Down,
            "timestamp": health.timestamp,
        })),
    )
}

/// Liveness check endpoint
pub async fn liveness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "uptime_seconds": state.uptime(),
            "timestamp": Utc::now(),
        })),
    )
}

/// Detailed health check endpoint
pub async fn detailed_health(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let health = state.report();
    if health.status != HealthStatus::Up {
        for (name, detail) in &health.details {
            if detail.status != HealthStatus::Up {
                warn!("Component {name} is not healthy: {:?}", detail.status);
            }
        }
    }

    (health.status.status_code(), Json(health))
}

/// Creates router with health check endpoints
pub fn health_routes<S>(state: Arc<HealthState>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .route("/details", get(detailed_health))
        .route("/version", get(version_info))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_engine_is_up() {
        let report = HealthState::new(true).report();
        assert_eq!(report.status, HealthStatus::Up);
        assert_eq!(report.details.len(), 4);
    }

    #[test]
    fn disabled_engine_degrades_but_stays_ready() {
        let report = HealthState::new(false).report();
        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.status.status_code(), StatusCode::OK);
        let seasonal = &report.details["seasonal_engine"];
        assert_eq!(seasonal.status, HealthStatus::Degraded);
        assert!(seasonal.message.is_some());
    }
}
