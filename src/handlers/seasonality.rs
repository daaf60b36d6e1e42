use axum::{extract::State, response::Json, routing::get, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::ValidatedJson,
    ml::{SalesRecord, SeasonalityReport},
    ApiResponse, AppState,
};

/// Seasonality routes mounted under `/api/v1`.
pub fn seasonality_routes() -> Router<AppState> {
    Router::new().route(
        "/seasonality",
        get(get_seasonality).post(analyze_seasonality),
    )
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct SeasonalityRequest {
    #[serde(default, alias = "historicalSales")]
    #[validate]
    pub historical_sales: Vec<SalesRecord>,
}

/// The baseline retail seasonality profile
#[utoipa::path(
    get,
    path = "/api/v1/seasonality",
    responses(
        (status = 200, description = "Baseline seasonality profile", body = ApiResponse<SeasonalityReport>)
    ),
    tag = "Analytics"
)]
pub async fn get_seasonality(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SeasonalityReport>>, ServiceError> {
    let report = state.services.seasonality.baseline().await;
    Ok(Json(ApiResponse::success(report)))
}

/// Seasonality derived from the supplied sales history
#[utoipa::path(
    post,
    path = "/api/v1/seasonality",
    request_body = SeasonalityRequest,
    responses(
        (status = 200, description = "Seasonality derived from history", body = ApiResponse<SeasonalityReport>),
        (status = 400, description = "Invalid sales history", body = crate::errors::ErrorResponse)
    ),
    tag = "Analytics"
)]
pub async fn analyze_seasonality(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SeasonalityRequest>,
) -> Result<Json<ApiResponse<SeasonalityReport>>, ServiceError> {
    let report = state
        .services
        .seasonality
        .from_history(request.historical_sales)
        .await;
    Ok(Json(ApiResponse::success(report)))
}
