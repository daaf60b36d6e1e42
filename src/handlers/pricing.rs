use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    errors::ServiceError,
    handlers::common::ValidatedJson,
    ml::PriceObservation,
    services::pricing::PriceRecommendation,
    ApiResponse, AppState,
};

/// Units assumed sold when a history entry omits its quantity
const DEFAULT_OBSERVED_QUANTITY: f64 = 10.0;

/// Pricing routes mounted under `/api/v1`.
pub fn pricing_routes() -> Router<AppState> {
    Router::new().route("/price-optimize", post(optimize_price))
}

fn positive(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("positive");
        err.message = Some("must be greater than zero".into());
        Err(err)
    }
}

/// A past price point. Missing fields fall back to the current price and to
/// ten units.
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct PriceHistoryEntry {
    #[validate(range(min = 0.0))]
    #[schema(example = 19.5)]
    pub price: Option<f64>,
    #[validate(range(min = 0.0))]
    #[schema(example = 14)]
    pub quantity: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct PriceOptimizationRequest {
    #[serde(alias = "productId")]
    #[validate(length(min = 1, message = "product_id must not be empty"))]
    #[schema(example = "prod-123")]
    pub product_id: String,
    #[serde(alias = "currentPrice")]
    #[validate(custom = "positive")]
    #[schema(example = 20.0)]
    pub current_price: f64,
    #[serde(alias = "costPrice")]
    #[validate(range(min = 0.0, message = "cost_price must be non-negative"))]
    #[schema(example = 10.0)]
    pub cost_price: f64,
    #[serde(default, alias = "historicalSales")]
    #[validate]
    pub historical_sales: Vec<PriceHistoryEntry>,
    #[serde(default, alias = "competitorPrices", alias = "competitors_prices")]
    pub competitor_prices: Option<Vec<f64>>,
}

impl PriceOptimizationRequest {
    fn observations(&self) -> Vec<PriceObservation> {
        self.historical_sales
            .iter()
            .map(|entry| {
                PriceObservation::new(
                    entry.price.unwrap_or(self.current_price),
                    entry.quantity.unwrap_or(DEFAULT_OBSERVED_QUANTITY),
                )
            })
            .collect()
    }
}

/// Recommend a price from the observed price/demand history
#[utoipa::path(
    post,
    path = "/api/v1/price-optimize",
    request_body = PriceOptimizationRequest,
    responses(
        (status = 200, description = "Price recommendation generated", body = ApiResponse<PriceRecommendation>),
        (status = 400, description = "Invalid pricing request", body = crate::errors::ErrorResponse),
        (status = 500, description = "Price could not be computed", body = crate::errors::ErrorResponse)
    ),
    tag = "Pricing"
)]
pub async fn optimize_price(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<PriceOptimizationRequest>,
) -> Result<Json<ApiResponse<PriceRecommendation>>, ServiceError> {
    let observations = request.observations();
    let recommendation = state
        .services
        .pricing
        .optimize(
            request.product_id,
            request.current_price,
            request.cost_price,
            observations,
            request.competitor_prices,
        )
        .await?;

    Ok(Json(ApiResponse::success(recommendation)))
}
