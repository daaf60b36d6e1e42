use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    metrics::ANALYTICS_METRICS,
    ml::{PriceObservation, PriceOptimizer, PricingBasis, ProjectionPair},
};

/// Price recommendation for one product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PriceRecommendation {
    pub product_id: String,
    #[schema(example = 21.0)]
    pub optimal_price: f64,
    #[schema(example = -1.2)]
    pub price_elasticity: f64,
    /// Units sold per period at the current and at the optimal price
    pub predicted_demand: ProjectionPair,
    pub revenue_projection: ProjectionPair,
    pub confidence: f64,
    pub basis: PricingBasis,
}

#[derive(Debug, Clone, Default)]
pub struct PricingService {
    optimizer: PriceOptimizer,
}

impl PricingService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn optimize(
        &self,
        product_id: String,
        current_price: f64,
        cost_price: f64,
        history: Vec<PriceObservation>,
        competitor_prices: Option<Vec<f64>>,
    ) -> Result<PriceRecommendation, ServiceError> {
        info!(
            product_id = %product_id,
            observations = history.len(),
            "Optimizing price"
        );
        if let Some(prices) = competitor_prices.as_deref().filter(|p| !p.is_empty()) {
            debug!(competitors = prices.len(), "competitor prices are not used by the model");
        }

        let started = Instant::now();
        let result = self.optimizer.optimize(current_price, cost_price, &history)?;
        ANALYTICS_METRICS.record_price_optimization(result.basis, started.elapsed());

        if result.is_heuristic() {
            debug!(basis = ?result.basis, "using heuristic price recommendation");
        }

        Ok(PriceRecommendation {
            product_id,
            optimal_price: result.optimal_price,
            price_elasticity: result.elasticity,
            predicted_demand: result.demand,
            revenue_projection: result.revenue,
            confidence: result.confidence,
            basis: result.basis,
        })
    }
}
