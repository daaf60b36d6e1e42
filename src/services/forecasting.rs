use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::{
    errors::ServiceError,
    metrics::ANALYTICS_METRICS,
    ml::{
        forecasting::history_confidence,
        regression::{mean_or_zero, round_to},
        seasonality::month_index,
        ForecastModel, ForecastPoint, Forecaster, SalesRecord, SeasonalityFlags,
    },
    tracing::log_slow_model_run,
};

const HIGH_DEMAND_THRESHOLD: f64 = 20.0;
const LOW_DEMAND_THRESHOLD: f64 = 5.0;
/// Stock cover (days) below which a reorder is suggested
const REORDER_COVER_DAYS: f64 = 14.0;
/// Stock cover (days) below which a reorder is urgent
const URGENT_COVER_DAYS: f64 = 7.0;
/// Days of demand a reorder should cover
const REORDER_HORIZON_DAYS: f64 = 21.0;
/// Reported cover when there is no expected demand
const UNLIMITED_COVER_DAYS: f64 = 999.0;
const TREND_WINDOW: usize = 7;
const SLOW_MODEL_RUN_MS: u64 = 500;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfidenceInterval {
    #[schema(value_type = String, format = Date)]
    pub date: chrono::NaiveDate,
    pub lower: u64,
    pub upper: u64,
}

impl From<&ForecastPoint> for ConfidenceInterval {
    fn from(point: &ForecastPoint) -> Self {
        Self {
            date: point.date,
            lower: point.lower_bound,
            upper: point.upper_bound,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AccuracyMetrics {
    /// Stability of recent sales, between 0 and 1
    pub confidence_score: f64,
    #[schema(example = "estimated")]
    pub model_accuracy: String,
}

/// Forecast for a single product
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductForecast {
    pub product_id: String,
    pub forecast: Vec<ForecastPoint>,
    pub confidence_intervals: Vec<ConfidenceInterval>,
    pub seasonality_patterns: SeasonalityFlags,
    pub recommendations: Vec<String>,
    pub model_used: ForecastModel,
    pub accuracy_metrics: AccuracyMetrics,
}

/// A product variant in a bulk forecast request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductVariant {
    #[serde(default = "unknown_variant_id")]
    pub id: String,
    /// Key into the sales histories; the id is used when absent
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Units currently on hand
    #[serde(default)]
    pub stock: u64,
}

fn unknown_variant_id() -> String {
    "unknown".to_string()
}

impl ProductVariant {
    fn sales_key(&self) -> &str {
        self.sku.as_deref().unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VariantForecast {
    pub variant_id: String,
    pub name: String,
    pub forecast: Vec<ForecastPoint>,
    /// Mean predicted units per day, 1 decimal
    pub avg_daily_demand: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReorderPriority {
    High,
    Medium,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReorderRecommendation {
    pub variant_id: String,
    pub current_stock: u64,
    /// Days the current stock lasts at the forecast demand, 1 decimal
    pub days_remaining: f64,
    pub recommended_order_quantity: u64,
    pub priority: ReorderPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DemandTrend {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockOptimization {
    pub total_variants: usize,
    /// High priority reorders
    pub low_stock_alerts: usize,
    /// Share of variants with sufficient stock, in percent
    pub optimization_score: f64,
}

/// Forecasts and stock guidance for a set of variants
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkForecast {
    pub forecasts: Vec<VariantForecast>,
    pub reorder_recommendations: Vec<ReorderRecommendation>,
    pub demand_trends: BTreeMap<String, DemandTrend>,
    pub seasonal_index: BTreeMap<String, f64>,
    pub stock_optimization: StockOptimization,
}

fn demand_recommendations(average: f64) -> Vec<String> {
    let mut recommendations = Vec::new();
    if average > HIGH_DEMAND_THRESHOLD {
        recommendations.push("High demand expected - consider increasing inventory".to_string());
    } else if average < LOW_DEMAND_THRESHOLD {
        recommendations.push("Low demand expected - optimize stock levels".to_string());
    }
    recommendations.push(format!(
        "Forecast suggests average daily sales of {} units",
        average.round()
    ));
    recommendations
}

/// Compares the first week of predictions with the second one
fn demand_trend(points: &[ForecastPoint]) -> Option<DemandTrend> {
    if points.len() < TREND_WINDOW {
        return None;
    }
    let window_mean = |window: &[ForecastPoint]| {
        let values: Vec<f64> = window.iter().map(|p| p.predicted_quantity as f64).collect();
        mean_or_zero(&values)
    };

    let recent = window_mean(&points[..TREND_WINDOW]);
    let next = &points[TREND_WINDOW..points.len().min(2 * TREND_WINDOW)];
    if next.is_empty() {
        return Some(DemandTrend::Stable);
    }
    let following = window_mean(next);

    Some(if recent > following * 1.1 {
        DemandTrend::Increasing
    } else if recent < following * 0.9 {
        DemandTrend::Decreasing
    } else {
        DemandTrend::Stable
    })
}

fn reorder_recommendation(variant: &ProductVariant, avg_demand: f64) -> Option<ReorderRecommendation> {
    let days_of_stock = if avg_demand > 0.0 {
        variant.stock as f64 / avg_demand
    } else {
        UNLIMITED_COVER_DAYS
    };
    if days_of_stock >= REORDER_COVER_DAYS {
        return None;
    }

    Some(ReorderRecommendation {
        variant_id: variant.id.clone(),
        current_stock: variant.stock,
        days_remaining: round_to(days_of_stock, 1),
        recommended_order_quantity: (avg_demand * REORDER_HORIZON_DAYS).round() as u64,
        priority: if days_of_stock < URGENT_COVER_DAYS {
            ReorderPriority::High
        } else {
            ReorderPriority::Medium
        },
    })
}

/// Demand forecasting for single products and variant batches
#[derive(Debug, Clone)]
pub struct ForecastingService {
    forecaster: Forecaster,
}

impl ForecastingService {
    pub fn new(forecaster: Forecaster) -> Self {
        Self { forecaster }
    }

    pub fn seasonal_engine_enabled(&self) -> bool {
        self.forecaster.seasonal_engine_enabled()
    }

    fn run_model(
        &self,
        history: &[SalesRecord],
        days: u32,
        requested: ForecastModel,
    ) -> Result<crate::ml::Forecast, ServiceError> {
        let started = Instant::now();
        let forecast = self.forecaster.predict(history, days, requested)?;
        let elapsed = started.elapsed();

        ANALYTICS_METRICS.record_forecast(requested, forecast.model_used, history.is_empty(), elapsed);
        log_slow_model_run(
            &forecast.model_used.to_string(),
            elapsed,
            std::time::Duration::from_millis(SLOW_MODEL_RUN_MS),
        );
        Ok(forecast)
    }

    /// Forecast `days` of demand for one product
    pub async fn forecast(
        &self,
        product_id: String,
        history: Vec<SalesRecord>,
        days: u32,
        requested: ForecastModel,
    ) -> Result<ProductForecast, ServiceError> {
        info!(
            product_id = %product_id,
            records = history.len(),
            days,
            model = %requested,
            "Generating demand forecast"
        );

        let forecast = self.run_model(&history, days, requested)?;
        let recommendations = demand_recommendations(forecast.average_quantity());

        Ok(ProductForecast {
            product_id,
            confidence_intervals: forecast.points.iter().map(ConfidenceInterval::from).collect(),
            seasonality_patterns: forecast.seasonality,
            recommendations,
            model_used: forecast.model_used,
            accuracy_metrics: AccuracyMetrics {
                confidence_score: history_confidence(&history),
                model_accuracy: "estimated".to_string(),
            },
            forecast: forecast.points,
        })
    }

    /// Forecast every variant with the default model and derive stock guidance
    pub async fn bulk_forecast(
        &self,
        variants: Vec<ProductVariant>,
        histories: HashMap<String, Vec<SalesRecord>>,
        days: u32,
    ) -> Result<BulkForecast, ServiceError> {
        info!(variants = variants.len(), days, "Generating bulk demand forecast");
        ANALYTICS_METRICS.bulk_forecasts_total.inc();

        let mut forecasts = Vec::with_capacity(variants.len());
        let mut reorder_recommendations = Vec::new();
        let mut demand_trends = BTreeMap::new();
        let mut seasonal_index = BTreeMap::new();

        for variant in &variants {
            let history = histories
                .get(variant.sales_key())
                .map(Vec::as_slice)
                .unwrap_or_default();
            if history.is_empty() {
                debug!(variant_id = %variant.id, key = variant.sales_key(), "no history for variant");
            }

            let forecast = self.run_model(history, days, ForecastModel::default())?;
            let avg_demand = forecast.average_quantity();

            if let Some(recommendation) = reorder_recommendation(variant, avg_demand) {
                reorder_recommendations.push(recommendation);
            }
            if let Some(trend) = demand_trend(&forecast.points) {
                demand_trends.insert(variant.id.clone(), trend);
            }
            let index = forecast
                .points
                .first()
                .map_or(1.0, |p| month_index(history, p.date.month()));
            seasonal_index.insert(variant.id.clone(), index);

            forecasts.push(VariantForecast {
                variant_id: variant.id.clone(),
                name: variant.name.clone().unwrap_or_else(|| "Unknown".to_string()),
                forecast: forecast.points,
                avg_daily_demand: round_to(avg_demand, 1),
            });
        }

        let total_variants = forecasts.len();
        let low_stock_alerts = reorder_recommendations
            .iter()
            .filter(|r| r.priority == ReorderPriority::High)
            .count();
        let optimization_score = if total_variants == 0 {
            100.0
        } else {
            let covered = total_variants - reorder_recommendations.len();
            round_to(covered as f64 / total_variants as f64 * 100.0, 1)
        };

        Ok(BulkForecast {
            forecasts,
            reorder_recommendations,
            demand_trends,
            seasonal_index,
            stock_optimization: StockOptimization {
                total_variants,
                low_stock_alerts,
                optimization_score,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn point(quantity: u64) -> ForecastPoint {
        ForecastPoint {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            predicted_quantity: quantity,
            lower_bound: quantity,
            upper_bound: quantity,
        }
    }

    fn variant(id: &str, sku: Option<&str>, stock: u64) -> ProductVariant {
        ProductVariant {
            id: id.to_string(),
            sku: sku.map(str::to_string),
            name: None,
            stock,
        }
    }

    fn steady_history(quantity: u64) -> Vec<SalesRecord> {
        (0..30)
            .map(|i| {
                SalesRecord::new(
                    NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + chrono::Duration::days(i),
                    quantity,
                    quantity as f64 * 5.0,
                )
            })
            .collect()
    }

    #[test]
    fn demand_messages_follow_thresholds() {
        assert_eq!(
            demand_recommendations(25.0),
            vec![
                "High demand expected - consider increasing inventory".to_string(),
                "Forecast suggests average daily sales of 25 units".to_string(),
            ]
        );
        assert_eq!(demand_recommendations(3.4)[0], "Low demand expected - optimize stock levels");
        assert_eq!(demand_recommendations(10.0).len(), 1);
    }

    #[test]
    fn trend_compares_consecutive_weeks() {
        let rising: Vec<ForecastPoint> = (0..14).map(|i| point(if i < 7 { 20 } else { 10 })).collect();
        assert_eq!(demand_trend(&rising), Some(DemandTrend::Increasing));
        let falling: Vec<ForecastPoint> = (0..14).map(|i| point(if i < 7 { 10 } else { 20 })).collect();
        assert_eq!(demand_trend(&falling), Some(DemandTrend::Decreasing));
        let flat: Vec<ForecastPoint> = (0..10).map(|_| point(10)).collect();
        assert_eq!(demand_trend(&flat), Some(DemandTrend::Stable));
        assert_eq!(demand_trend(&flat[..7]), Some(DemandTrend::Stable));
        assert_eq!(demand_trend(&flat[..6]), None);
    }

    #[test]
    fn reorder_priority_depends_on_cover() {
        let urgent = reorder_recommendation(&variant("v1", None, 30), 10.0).unwrap();
        assert_eq!(urgent.priority, ReorderPriority::High);
        assert_eq!(urgent.days_remaining, 3.0);
        assert_eq!(urgent.recommended_order_quantity, 210);

        let soon = reorder_recommendation(&variant("v2", None, 100), 10.0).unwrap();
        assert_eq!(soon.priority, ReorderPriority::Medium);

        assert!(reorder_recommendation(&variant("v3", None, 140), 10.0).is_none());
        assert!(reorder_recommendation(&variant("v4", None, 0), 0.0).is_none());
    }

    #[tokio::test]
    async fn forecast_mirrors_bounds_into_intervals() {
        let service = ForecastingService::new(Forecaster::default());
        let result = service
            .forecast("sku-1".to_string(), steady_history(12), 10, ForecastModel::Statistical)
            .await
            .unwrap();

        assert_eq!(result.forecast.len(), 10);
        assert_eq!(result.model_used, ForecastModel::Statistical);
        assert_eq!(result.accuracy_metrics.confidence_score, 1.0);
        for (point, interval) in result.forecast.iter().zip(&result.confidence_intervals) {
            assert_eq!(point.date, interval.date);
            assert_eq!(point.lower_bound, interval.lower);
            assert_eq!(point.upper_bound, interval.upper);
        }
    }

    #[tokio::test]
    async fn bulk_forecast_looks_up_history_by_sku() {
        let service = ForecastingService::new(Forecaster::default());
        let mut histories = HashMap::new();
        histories.insert("SKU-A".to_string(), steady_history(10));
        histories.insert("v2".to_string(), steady_history(2));

        let result = service
            .bulk_forecast(
                vec![variant("v1", Some("SKU-A"), 50), variant("v2", None, 1000)],
                histories,
                14,
            )
            .await
            .unwrap();

        assert_eq!(result.forecasts.len(), 2);
        assert_eq!(result.forecasts[0].name, "Unknown");
        assert_eq!(result.forecasts[0].avg_daily_demand, 10.0);
        assert_eq!(result.forecasts[1].avg_daily_demand, 2.0);

        assert_eq!(result.reorder_recommendations.len(), 1);
        assert_eq!(result.reorder_recommendations[0].variant_id, "v1");
        assert_eq!(result.reorder_recommendations[0].priority, ReorderPriority::High);
        assert_eq!(result.demand_trends["v1"], DemandTrend::Stable);
        // the history only covers March, the forecast starts in March
        assert_eq!(result.seasonal_index["v1"], 1.0);
        assert_eq!(result.stock_optimization.total_variants, 2);
        assert_eq!(result.stock_optimization.low_stock_alerts, 1);
        assert_eq!(result.stock_optimization.optimization_score, 50.0);
    }

    #[tokio::test]
    async fn bulk_forecast_without_variants_is_fully_optimized() {
        let service = ForecastingService::new(Forecaster::default());
        let result = service.bulk_forecast(Vec::new(), HashMap::new(), 30).await.unwrap();
        assert!(result.forecasts.is_empty());
        assert_eq!(result.stock_optimization.optimization_score, 100.0);
    }
}
