/*!
 * # Price Optimization
 *
 * Estimates price elasticity of demand with a log-log regression over the
 * observed price/quantity pairs, then searches a price grid for the revenue
 * maximising point of the constant-elasticity demand curve
 * `q(p) = a * p^elasticity`.
 *
 * Sparse or flat histories get fixed low-confidence recommendations instead
 * of an error.
 */

use crate::errors::ServiceError;
use crate::ml::regression::{least_squares, linspace, mean_or_zero, population_std, round_to};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Elasticity assumed when it cannot be estimated
pub const DEFAULT_ELASTICITY: f64 = -1.2;
/// Markup suggested by the heuristic recommendations
const HEURISTIC_MARKUP: f64 = 1.05;
/// Candidate prices evaluated by the grid search
const GRID_POINTS: usize = 100;
/// Minimum price spread for an elasticity fit
const MIN_PRICE_STD: f64 = 0.01;
/// Minimum observations for an elasticity fit
const MIN_OBSERVATIONS: usize = 3;

/// One observed price point and the quantity sold at it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceObservation {
    pub price: f64,
    pub quantity: f64,
}

impl PriceObservation {
    pub fn new(price: f64, quantity: f64) -> Self {
        Self { price, quantity }
    }
}

/// A value at the current and at the recommended price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProjectionPair {
    pub current: f64,
    pub optimal: f64,
}

/// How a recommendation was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PricingBasis {
    /// No history at all
    NoHistory,
    /// Too few observations or prices that barely move
    InsufficientVariation,
    /// Grid search over a fitted demand curve
    ElasticityModel,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceOptimization {
    pub optimal_price: f64,
    pub elasticity: f64,
    pub demand: ProjectionPair,
    pub revenue: ProjectionPair,
    pub confidence: f64,
    pub basis: PricingBasis,
}

impl PriceOptimization {
    pub fn is_heuristic(&self) -> bool {
        self.basis != PricingBasis::ElasticityModel
    }
}

/// Constant-elasticity demand curve `q(p) = scale * p^elasticity`
#[derive(Debug, Clone, Copy)]
struct DemandCurve {
    scale: f64,
    elasticity: f64,
}

impl DemandCurve {
    fn demand(&self, price: f64) -> f64 {
        self.scale * price.powf(self.elasticity)
    }

    fn revenue(&self, price: f64) -> f64 {
        price * self.demand(price)
    }
}

/// Log-log elasticity over observations where both logs exist.
/// Falls back to [`DEFAULT_ELASTICITY`] with fewer than three such points.
pub fn estimate_elasticity(history: &[PriceObservation]) -> f64 {
    let (log_prices, log_quantities): (Vec<f64>, Vec<f64>) = history
        .iter()
        .filter(|o| o.price > 0.0 && o.quantity > 0.0)
        .map(|o| (o.price.ln(), o.quantity.ln()))
        .unzip();

    if log_prices.len() < MIN_OBSERVATIONS {
        return DEFAULT_ELASTICITY;
    }

    least_squares(&log_prices, &log_quantities).map_or(DEFAULT_ELASTICITY, |fit| fit.slope)
}

/// Confidence grows with the number of observations and saturates at 0.95
pub fn fit_confidence(observations: usize) -> f64 {
    let base = (0.5 + 0.1 * observations as f64).min(0.95);
    let boosted = if observations >= MIN_OBSERVATIONS {
        base + 0.1
    } else {
        base
    };
    round_to(boosted.min(0.95), 2)
}

fn ensure_finite(label: &str, value: f64) -> Result<f64, ServiceError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ServiceError::ComputationError(format!(
            "{label} is not a finite number"
        )))
    }
}

/// `price` rounded to whole cents, kept inside the searched range `[a, b]`.
///
/// Falls back to the unrounded price when the range holds no whole cent.
fn cents_within(price: f64, a: f64, b: f64) -> f64 {
    let (low, high) = (a.min(b), a.max(b));
    let mut first_cent = (low * 100.0).ceil();
    if first_cent / 100.0 < low {
        first_cent += 1.0;
    }
    let mut last_cent = (high * 100.0).floor();
    if last_cent / 100.0 > high {
        last_cent -= 1.0;
    }
    let (first, last) = (first_cent / 100.0, last_cent / 100.0);
    if first > last {
        return price;
    }
    round_to(price, 2).clamp(first, last)
}

#[derive(Debug, Default, Clone)]
pub struct PriceOptimizer;

impl PriceOptimizer {
    pub fn new() -> Self {
        Self
    }

    /// Recommend a revenue maximising price for `current_price` given the
    /// unit cost and past price/quantity observations.
    pub fn optimize(
        &self,
        current_price: f64,
        cost_price: f64,
        history: &[PriceObservation],
    ) -> Result<PriceOptimization, ServiceError> {
        if history.is_empty() {
            return Ok(PriceOptimization {
                optimal_price: round_to(current_price * HEURISTIC_MARKUP, 2),
                elasticity: DEFAULT_ELASTICITY,
                demand: ProjectionPair {
                    current: 100.0,
                    optimal: 95.0,
                },
                revenue: ProjectionPair {
                    current: 10_000.0,
                    optimal: 10_500.0,
                },
                confidence: 0.7,
                basis: PricingBasis::NoHistory,
            });
        }

        let prices: Vec<f64> = history.iter().map(|o| o.price).collect();
        let quantities: Vec<f64> = history.iter().map(|o| o.quantity).collect();

        if history.len() < MIN_OBSERVATIONS || population_std(&prices) < MIN_PRICE_STD {
            return Ok(PriceOptimization {
                optimal_price: round_to(current_price * HEURISTIC_MARKUP, 2),
                elasticity: DEFAULT_ELASTICITY,
                demand: ProjectionPair {
                    current: 100.0,
                    optimal: 95.0,
                },
                revenue: ProjectionPair {
                    current: round_to(current_price * 100.0, 2),
                    optimal: round_to(current_price * HEURISTIC_MARKUP * 95.0, 2),
                },
                confidence: 0.6,
                basis: PricingBasis::InsufficientVariation,
            });
        }

        let elasticity = estimate_elasticity(history);
        let scale = if elasticity == 0.0 {
            100.0
        } else {
            mean_or_zero(&quantities) / mean_or_zero(&prices).powf(elasticity)
        };
        let curve = DemandCurve {
            scale: ensure_finite("demand curve scale", scale)?,
            elasticity,
        };

        let (grid_start, grid_end) = (cost_price * 1.1, current_price * 2.0);
        let mut best: Option<(f64, f64)> = None;
        for price in linspace(grid_start, grid_end, GRID_POINTS) {
            if price <= 0.0 {
                continue;
            }
            let revenue = curve.revenue(price);
            if revenue.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, top)| revenue > top) {
                best = Some((price, revenue));
            }
        }
        let (best_price, _) = best.ok_or_else(|| {
            ServiceError::ComputationError("no positive candidate price to evaluate".to_string())
        })?;
        let optimal_price = cents_within(best_price, grid_start, grid_end);

        let current_demand = ensure_finite("current demand", curve.demand(current_price))?;
        let optimal_demand = ensure_finite("optimal demand", curve.demand(optimal_price))?;
        let current_revenue = ensure_finite("current revenue", current_price * current_demand)?;
        let optimal_revenue = ensure_finite("optimal revenue", optimal_price * optimal_demand)?;

        Ok(PriceOptimization {
            optimal_price,
            elasticity: round_to(elasticity, 2),
            demand: ProjectionPair {
                current: current_demand.round(),
                optimal: optimal_demand.round(),
            },
            revenue: ProjectionPair {
                current: round_to(current_revenue, 2),
                optimal: round_to(optimal_revenue, 2),
            },
            confidence: fit_confidence(history.len()),
            basis: PricingBasis::ElasticityModel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn observations(pairs: &[(f64, f64)]) -> Vec<PriceObservation> {
        pairs
            .iter()
            .map(|&(p, q)| PriceObservation::new(p, q))
            .collect()
    }

    #[test]
    fn empty_history_uses_fixed_recommendation() {
        let result = PriceOptimizer::new().optimize(20.0, 10.0, &[]).unwrap();
        assert_eq!(result.optimal_price, 21.0);
        assert_eq!(result.elasticity, -1.2);
        assert_eq!(result.demand, ProjectionPair { current: 100.0, optimal: 95.0 });
        assert_eq!(result.revenue, ProjectionPair { current: 10_000.0, optimal: 10_500.0 });
        assert_eq!(result.confidence, 0.7);
        assert_eq!(result.basis, PricingBasis::NoHistory);
        assert!(result.is_heuristic());
    }

    #[test]
    fn flat_prices_use_scaled_recommendation() {
        let history = observations(&[(20.0, 10.0), (20.0, 12.0), (20.0, 9.0)]);
        let result = PriceOptimizer::new().optimize(20.0, 10.0, &history).unwrap();
        assert_eq!(result.basis, PricingBasis::InsufficientVariation);
        assert_eq!(result.revenue, ProjectionPair { current: 2000.0, optimal: 1995.0 });
        assert_eq!(result.confidence, 0.6);
    }

    #[test]
    fn two_observations_are_not_enough() {
        let history = observations(&[(18.0, 12.0), (22.0, 8.0)]);
        let result = PriceOptimizer::new().optimize(20.0, 10.0, &history).unwrap();
        assert_eq!(result.basis, PricingBasis::InsufficientVariation);
    }

    #[test]
    fn elastic_demand_gives_negative_elasticity_within_grid() {
        let history = observations(&[(18.0, 12.0), (20.0, 10.0), (22.0, 8.0), (24.0, 6.0), (19.0, 11.0)]);
        let result = PriceOptimizer::new().optimize(20.0, 10.0, &history).unwrap();

        assert_eq!(result.basis, PricingBasis::ElasticityModel);
        assert!(result.elasticity < 0.0);
        assert!((11.0..=40.0).contains(&result.optimal_price));
        // elastic demand (|e| > 1) pushes revenue towards the cheapest candidate,
        // 10 x 1.1 lands a hair above 11.00 in floating point
        assert_eq!(result.optimal_price, 11.01);
        assert_eq!(result.confidence, 0.95);
        assert!(result.revenue.optimal >= result.revenue.current);
    }

    #[test]
    fn inelastic_demand_prefers_the_top_of_the_grid() {
        let history = observations(&[(10.0, 100.0), (12.0, 98.0), (14.0, 96.0), (16.0, 95.0)]);
        let result = PriceOptimizer::new().optimize(15.0, 5.0, &history).unwrap();
        assert!(result.elasticity > -1.0);
        assert_eq!(result.optimal_price, 30.0);
    }

    #[test]
    fn zero_quantities_are_excluded_from_the_fit() {
        let history = observations(&[(10.0, 0.0), (12.0, 0.0), (14.0, 5.0), (16.0, 4.0)]);
        assert_eq!(estimate_elasticity(&history), DEFAULT_ELASTICITY);
        let result = PriceOptimizer::new().optimize(12.0, 6.0, &history).unwrap();
        assert_eq!(result.elasticity, -1.2);
    }

    #[test]
    fn positive_elasticity_is_tolerated() {
        let history = observations(&[(10.0, 5.0), (12.0, 7.0), (14.0, 9.0)]);
        let result = PriceOptimizer::new().optimize(12.0, 6.0, &history).unwrap();
        assert!(result.elasticity > 0.0);
        assert_eq!(result.optimal_price, 24.0);
    }

    #[test]
    fn rounded_price_stays_above_the_margin_floor() {
        let history = observations(&[(18.0, 12.0), (20.0, 10.0), (22.0, 8.0), (24.0, 6.0), (19.0, 11.0)]);
        let cost = 10.004;
        let result = PriceOptimizer::new().optimize(20.0, cost, &history).unwrap();
        assert!(result.optimal_price >= cost * 1.1, "{:?}", result);
        assert_eq!(result.optimal_price, 11.01);
    }

    #[test]
    fn cents_are_clamped_into_the_range() {
        assert_eq!(cents_within(11.0044, 11.0044, 40.0), 11.01);
        assert_eq!(cents_within(39.999, 11.0, 39.999), 39.99);
        assert_eq!(cents_within(25.123, 11.0, 40.0), 25.12);
        assert_eq!(cents_within(5.0044, 5.0041, 5.0049), 5.0044);
    }

    #[test]
    fn confidence_is_monotonic_and_capped() {
        assert_eq!(fit_confidence(1), 0.6);
        assert_eq!(fit_confidence(3), 0.9);
        assert_eq!(fit_confidence(4), 0.95);
        assert_eq!(fit_confidence(50), 0.95);
        assert!((1..20).all(|n| fit_confidence(n) <= fit_confidence(n + 1)));
    }

    #[test]
    fn overflowing_curve_is_a_computation_error() {
        let history = observations(&[(1.0, 1e300), (1.02, 1.0), (1.04, 1e-300)]);
        let err = PriceOptimizer::new().optimize(10.0, 1.0, &history).unwrap_err();
        assert!(matches!(err, ServiceError::ComputationError(_)));
    }
}
