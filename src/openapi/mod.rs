use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StateSet Insights API",
        version = "0.2.1",
        description = r#"
# StateSet Insights

Stateless analytics over caller supplied data. Nothing is stored between
requests; every model is fitted on the request body.

## Features

- **Demand forecasting**: seasonal decomposition, random forest and statistical trend models
- **Bulk forecasting**: per variant forecasts with reorder guidance
- **Price optimization**: constant elasticity demand model with margin and price caps
- **Customer segmentation**: RFM scoring into six named segments
- **Seasonality**: baseline or history derived monthly indices

## Error Handling

Errors share one response format:

```json
{
  "error": "Bad Request",
  "message": "Validation failed: product_id: product_id must not be empty",
  "request_id": "4b8d1c0e-...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        contact(
            name = "StateSet Support",
            email = "support@stateset.io",
            url = "https://stateset.io"
        ),
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development")
    ),
    tags(
        (name = "Forecasting", description = "Demand forecasting endpoints"),
        (name = "Pricing", description = "Price optimization endpoints"),
        (name = "Customers", description = "Customer segmentation endpoints"),
        (name = "Analytics", description = "Seasonality analysis endpoints"),
        (name = "Health", description = "Service status endpoints")
    ),
    paths(
        crate::api_status,
        crate::handlers::forecasting::forecast_demand,
        crate::handlers::forecasting::bulk_forecast,
        crate::handlers::pricing::optimize_price,
        crate::handlers::segmentation::segment_customers,
        crate::handlers::seasonality::get_seasonality,
        crate::handlers::seasonality::analyze_seasonality,
    ),
    components(
        schemas(
            // Forecasting
            crate::handlers::forecasting::ForecastRequest,
            crate::handlers::forecasting::BulkForecastRequest,
            crate::ml::SalesRecord,
            crate::ml::ForecastModel,
            crate::ml::ForecastPoint,
            crate::ml::SeasonalityFlags,
            crate::services::forecasting::ProductForecast,
            crate::services::forecasting::ConfidenceInterval,
            crate::services::forecasting::AccuracyMetrics,
            crate::services::forecasting::ProductVariant,
            crate::services::forecasting::BulkForecast,
            crate::services::forecasting::VariantForecast,
            crate::services::forecasting::ReorderRecommendation,
            crate::services::forecasting::ReorderPriority,
            crate::services::forecasting::DemandTrend,
            crate::services::forecasting::StockOptimization,

            // Pricing
            crate::handlers::pricing::PriceOptimizationRequest,
            crate::handlers::pricing::PriceHistoryEntry,
            crate::services::pricing::PriceRecommendation,
            crate::ml::ProjectionPair,
            crate::ml::PricingBasis,

            // Segmentation
            crate::handlers::segmentation::SegmentationRequest,
            crate::handlers::segmentation::CustomerInput,
            crate::services::segmentation::CustomerSegmentation,
            crate::ml::SegmentSummary,

            // Seasonality
            crate::handlers::seasonality::SeasonalityRequest,
            crate::ml::SeasonalityReport,
            crate::ml::MonthlyIndex,
            crate::ml::SeasonalitySource,

            // Status
            crate::ServiceStatus,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
