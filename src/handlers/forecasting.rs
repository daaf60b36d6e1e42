use std::collections::HashMap;

use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    errors::ServiceError,
    handlers::common::{default_forecast_days, validate_forecast_days, ValidatedJson},
    ml::{ForecastModel, SalesRecord},
    services::forecasting::{BulkForecast, ProductForecast, ProductVariant},
    ApiResponse, AppState,
};

/// Forecast routes mounted under `/api/v1`.
pub fn forecast_routes() -> Router<AppState> {
    Router::new()
        .route("/forecast", post(forecast_demand))
        .route("/demand-forecast", post(bulk_forecast))
}

fn default_model_type() -> String {
    ForecastModel::default().to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct ForecastRequest {
    #[serde(alias = "productId")]
    #[validate(length(min = 1, message = "product_id must not be empty"))]
    #[schema(example = "prod-123")]
    pub product_id: String,
    /// Daily sales, oldest first. An empty history produces a synthetic one.
    #[serde(default, alias = "historicalSales")]
    #[validate]
    pub historical_sales: Vec<SalesRecord>,
    #[serde(default = "default_forecast_days", alias = "forecastDays")]
    #[schema(example = 30, minimum = 1)]
    pub forecast_days: u32,
    /// `prophet`, `random_forest` or `statistical`
    #[serde(default = "default_model_type", alias = "modelType")]
    #[schema(example = "prophet")]
    pub model_type: String,
}

fn validate_sales_map(map: &HashMap<String, Vec<SalesRecord>>) -> Result<(), ValidationError> {
    let invalid = map
        .values()
        .flatten()
        .any(|record| !record.revenue.is_finite() || record.revenue < 0.0);
    if invalid {
        let mut err = ValidationError::new("revenue");
        err.message = Some("revenue must be a non-negative number".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BulkForecastRequest {
    #[serde(default, alias = "productVariants")]
    pub product_variants: Vec<ProductVariant>,
    /// Sales histories keyed by variant sku (or id when it has no sku)
    #[serde(default, alias = "historicalSales")]
    #[validate(custom = "validate_sales_map")]
    pub historical_sales: HashMap<String, Vec<SalesRecord>>,
    #[serde(default = "default_forecast_days", alias = "forecastDays")]
    #[schema(example = 30, minimum = 1)]
    pub forecast_days: u32,
}

/// Forecast daily demand for a single product
#[utoipa::path(
    post,
    path = "/api/v1/forecast",
    request_body = ForecastRequest,
    responses(
        (status = 200, description = "Demand forecast generated", body = ApiResponse<ProductForecast>),
        (status = 400, description = "Invalid forecast request", body = crate::errors::ErrorResponse),
        (status = 500, description = "Forecast could not be computed", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecasting"
)]
pub async fn forecast_demand(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ForecastRequest>,
) -> Result<Json<ApiResponse<ProductForecast>>, ServiceError> {
    validate_forecast_days(
        request.forecast_days,
        state.config.forecasting.max_forecast_days,
    )?;

    let forecast = state
        .services
        .forecasting
        .forecast(
            request.product_id,
            request.historical_sales,
            request.forecast_days,
            ForecastModel::from_request(&request.model_type),
        )
        .await?;

    Ok(Json(ApiResponse::success(forecast)))
}

/// Forecast every product variant and derive reorder guidance
#[utoipa::path(
    post,
    path = "/api/v1/demand-forecast",
    request_body = BulkForecastRequest,
    responses(
        (status = 200, description = "Bulk forecast generated", body = ApiResponse<BulkForecast>),
        (status = 400, description = "Invalid bulk forecast request", body = crate::errors::ErrorResponse)
    ),
    tag = "Forecasting"
)]
pub async fn bulk_forecast(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<BulkForecastRequest>,
) -> Result<Json<ApiResponse<BulkForecast>>, ServiceError> {
    validate_forecast_days(
        request.forecast_days,
        state.config.forecasting.max_forecast_days,
    )?;

    let result = state
        .services
        .forecasting
        .bulk_forecast(
            request.product_variants,
            request.historical_sales,
            request.forecast_days,
        )
        .await?;

    Ok(Json(ApiResponse::success(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_accepts_camel_case_and_defaults() {
        let request: ForecastRequest = serde_json::from_value(json!({
            "productId": "p-1",
            "historicalSales": [{"date": "2024-01-01", "quantity": 3, "revenue": 30.0}]
        }))
        .unwrap();
        assert_eq!(request.product_id, "p-1");
        assert_eq!(request.historical_sales.len(), 1);
        assert_eq!(request.forecast_days, 30);
        assert_eq!(request.model_type, "prophet");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn empty_product_id_is_invalid() {
        let request: ForecastRequest =
            serde_json::from_value(json!({"product_id": ""})).unwrap();
        assert!(request.validate().is_err());
    }

    #[test]
    fn negative_revenue_in_bulk_history_is_invalid() {
        let request: BulkForecastRequest = serde_json::from_value(json!({
            "product_variants": [{"id": "v1", "stock": 5}],
            "historical_sales": {"v1": [{"date": "2024-01-01", "quantity": 1, "revenue": -1.0}]}
        }))
        .unwrap();
        assert!(request.validate().is_err());
    }
}
