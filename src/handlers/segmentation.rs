use axum::{extract::State, response::Json, routing::post, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    errors::ServiceError,
    handlers::common::ValidatedJson,
    ml::CustomerRecord,
    services::segmentation::CustomerSegmentation,
    ApiResponse, AppState,
};

/// Segmentation routes mounted under `/api/v1`.
pub fn segmentation_routes() -> Router<AppState> {
    Router::new().route("/customer-segmentation", post(segment_customers))
}

fn unknown_customer() -> String {
    "unknown".to_string()
}

fn default_recency_days() -> u32 {
    365
}

/// RFM attributes of one customer; missing values mean a long-idle customer
/// who never ordered.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CustomerInput {
    #[serde(default = "unknown_customer")]
    #[schema(example = "cust-42")]
    pub id: String,
    #[serde(
        default = "default_recency_days",
        alias = "days_since_last_order",
        alias = "recency"
    )]
    #[schema(example = 12)]
    pub recency_days: u32,
    #[serde(default, alias = "order_count")]
    #[schema(example = 8)]
    pub frequency: u32,
    #[serde(default, alias = "total_spent")]
    #[validate(range(min = 0.0, message = "monetary must be non-negative"))]
    #[schema(example = 1250.0)]
    pub monetary: f64,
}

impl From<CustomerInput> for CustomerRecord {
    fn from(input: CustomerInput) -> Self {
        CustomerRecord {
            id: input.id,
            recency_days: input.recency_days,
            frequency: input.frequency,
            monetary: input.monetary,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct SegmentationRequest {
    #[serde(default)]
    #[validate]
    pub customers: Vec<CustomerInput>,
}

/// Segment customers by recency, frequency and monetary value
#[utoipa::path(
    post,
    path = "/api/v1/customer-segmentation",
    request_body = SegmentationRequest,
    responses(
        (status = 200, description = "Customers segmented", body = ApiResponse<CustomerSegmentation>),
        (status = 400, description = "Invalid customer data", body = crate::errors::ErrorResponse)
    ),
    tag = "Customers"
)]
pub async fn segment_customers(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<SegmentationRequest>,
) -> Result<Json<ApiResponse<CustomerSegmentation>>, ServiceError> {
    let customers = request.customers.into_iter().map(CustomerRecord::from).collect();
    let segmentation = state.services.segmentation.segment(customers).await;
    Ok(Json(ApiResponse::success(segmentation)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn aliases_and_defaults() {
        let request: SegmentationRequest = serde_json::from_value(json!({
            "customers": [
                {"id": "a", "days_since_last_order": 3, "order_count": 7, "total_spent": 99.5},
                {}
            ]
        }))
        .unwrap();

        let records: Vec<CustomerRecord> =
            request.customers.into_iter().map(CustomerRecord::from).collect();
        assert_eq!(
            records[0],
            CustomerRecord {
                id: "a".to_string(),
                recency_days: 3,
                frequency: 7,
                monetary: 99.5,
            }
        );
        assert_eq!(records[1].id, "unknown");
        assert_eq!(records[1].recency_days, 365);
        assert_eq!(records[1].frequency, 0);
        assert_eq!(records[1].monetary, 0.0);
    }

    #[test]
    fn missing_customers_list_is_empty() {
        let request: SegmentationRequest = serde_json::from_value(json!({})).unwrap();
        assert!(request.customers.is_empty());
    }
}
