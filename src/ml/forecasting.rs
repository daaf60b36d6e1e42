/*!
 * # Demand Forecasting
 *
 * Produces an N-day forward forecast with a confidence band from a daily
 * sales history. Three interchangeable strategies are available:
 *
 * - **Seasonal decomposition**: linear trend over calendar days plus additive
 *   weekly and monthly components.
 * - **Random forest**: bagged regression trees over calendar features.
 * - **Statistical**: least-squares trend over the sample index with a
 *   sinusoidal yearly factor.
 *
 * The [`Forecaster`] captures the forecasting configuration once at startup
 * and resolves the requested strategy against it for every call.
 */

use crate::config::ForecastingConfig;
use crate::errors::ServiceError;
use crate::ml::random_forest::{ForestParams, RandomForestRegressor};
use crate::ml::regression::{least_squares, mean_or_zero, population_std, round_to, LinearFit};
use chrono::{Datelike, Days, Local, NaiveDate};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use strum::{Display, EnumString};
use tracing::debug;
use utoipa::ToSchema;
use validator::Validate;

/// z-score of a two-sided 95% interval
const BAND_Z: f64 = 1.96;
/// Minimum history span for the weekly component
const WEEKLY_MIN_SPAN_DAYS: i64 = 14;
/// Minimum history span for the monthly component
const YEARLY_MIN_SPAN_DAYS: i64 = 365;

/// One day of sales for a product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema, Validate)]
pub struct SalesRecord {
    #[schema(value_type = String, format = Date, example = "2024-11-01")]
    pub date: NaiveDate,
    #[serde(default)]
    #[schema(example = 12)]
    pub quantity: u64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "revenue must be non-negative"))]
    #[schema(example = 240.5)]
    pub revenue: f64,
}

impl SalesRecord {
    pub fn new(date: NaiveDate, quantity: u64, revenue: f64) -> Self {
        Self {
            date,
            quantity,
            revenue,
        }
    }
}

/// Estimation strategy. Unknown names fall back to [`ForecastModel::Statistical`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ToSchema,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(ascii_case_insensitive)]
pub enum ForecastModel {
    #[default]
    #[serde(rename = "prophet", alias = "seasonal")]
    #[strum(to_string = "prophet", serialize = "seasonal")]
    Seasonal,
    #[strum(to_string = "random_forest")]
    RandomForest,
    #[serde(alias = "linear")]
    #[strum(to_string = "statistical", serialize = "linear")]
    Statistical,
}

impl ForecastModel {
    /// Parse a model name from a request, treating anything unrecognised as
    /// the statistical model.
    pub fn from_request(name: &str) -> Self {
        name.trim().parse().unwrap_or_else(|_| {
            debug!(model = name, "unknown forecast model requested, using statistical");
            ForecastModel::Statistical
        })
    }
}

/// A single forecast day. Bounds always bracket the prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ForecastPoint {
    #[schema(value_type = String, format = Date, example = "2024-12-01")]
    pub date: NaiveDate,
    pub predicted_quantity: u64,
    pub lower_bound: u64,
    pub upper_bound: u64,
}

impl ForecastPoint {
    /// Build a point from raw model estimates. Values are floored at zero and
    /// rounded to whole units; non-finite estimates are a computation error.
    pub fn from_estimates(
        date: NaiveDate,
        predicted: f64,
        lower: f64,
        upper: f64,
    ) -> Result<Self, ServiceError> {
        if !(predicted.is_finite() && lower.is_finite() && upper.is_finite()) {
            return Err(ServiceError::ComputationError(format!(
                "forecast for {date} is not a finite number"
            )));
        }

        let predicted_quantity = to_units(predicted);
        Ok(Self {
            date,
            predicted_quantity,
            lower_bound: to_units(lower).min(predicted_quantity),
            upper_bound: to_units(upper).max(predicted_quantity),
        })
    }
}

fn to_units(value: f64) -> u64 {
    value.max(0.0).round() as u64
}

/// Seasonal patterns detected (or assumed) by a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SeasonalityFlags {
    pub weekly_pattern: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yearly_pattern: Option<bool>,
}

/// Forecast produced by one strategy run
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
    pub seasonality: SeasonalityFlags,
    pub model_used: ForecastModel,
}

impl Forecast {
    /// Mean predicted quantity, 0 for an empty forecast
    pub fn average_quantity(&self) -> f64 {
        let predictions: Vec<f64> = self
            .points
            .iter()
            .map(|p| p.predicted_quantity as f64)
            .collect();
        mean_or_zero(&predictions)
    }
}

/// Non-empty sales history sorted by date (stable, duplicates kept)
#[derive(Debug, Clone)]
pub struct SalesHistory {
    records: Vec<SalesRecord>,
}

impl SalesHistory {
    pub fn new(mut records: Vec<SalesRecord>) -> Option<Self> {
        if records.is_empty() {
            return None;
        }
        records.sort_by_key(|r| r.date);
        Some(Self { records })
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn quantities(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.quantity as f64).collect()
    }

    pub fn first_date(&self) -> NaiveDate {
        self.records[0].date
    }

    pub fn last_date(&self) -> NaiveDate {
        self.records[self.records.len() - 1].date
    }

    /// Days between the earliest and latest record
    pub fn span_days(&self) -> i64 {
        (self.last_date() - self.first_date()).num_days()
    }

    /// Dates of the `horizon` days following the latest record
    pub fn future_dates(&self, horizon: u32) -> Result<Vec<NaiveDate>, ServiceError> {
        let last = self.last_date();
        (1..=u64::from(horizon))
            .map(|offset| {
                last.checked_add_days(Days::new(offset)).ok_or_else(|| {
                    ServiceError::ComputationError(format!(
                        "forecast date {offset} days after {last} is out of range"
                    ))
                })
            })
            .collect()
    }
}

/// Demo series used when a caller supplies no history: `days` consecutive
/// days ending at `end`, quantities in [5, 50) and revenue in [100, 1000).
pub fn synthetic_history<R: Rng + ?Sized>(days: u32, end: NaiveDate, rng: &mut R) -> Vec<SalesRecord> {
    (0..u64::from(days.max(1)))
        .rev()
        .filter_map(|back| end.checked_sub_days(Days::new(back)))
        .map(|date| SalesRecord::new(date, rng.gen_range(5..50), rng.gen_range(100.0..1000.0)))
        .collect()
}

/// Confidence score derived from the variability of the last seven records.
/// 0.75 when there is no history.
pub fn history_confidence(records: &[SalesRecord]) -> f64 {
    let Some(history) = SalesHistory::new(records.to_vec()) else {
        return 0.75;
    };
    let recent = &history.records()[history.len().saturating_sub(7)..];
    let quantities: Vec<f64> = recent.iter().map(|r| r.quantity as f64).collect();
    let score = 1.0 - (population_std(&quantities) / (mean_or_zero(&quantities) + 1.0)).min(1.0);
    round_to(score, 2)
}

/// A forecasting strategy
pub trait ForecastStrategy: Send + Sync {
    fn model(&self) -> ForecastModel;

    fn forecast(&self, history: &SalesHistory, horizon: u32) -> Result<Forecast, ServiceError>;
}

/// Linear trend over calendar days with additive weekday and month effects
#[derive(Debug, Default)]
pub struct SeasonalDecomposition;

impl SeasonalDecomposition {
    /// Mean residual per bucket, centred over the buckets that have data.
    /// Buckets without data get a zero effect.
    fn bucket_effects<const N: usize>(residuals: &[f64], buckets: &[usize]) -> [f64; N] {
        let mut sums = [0.0; N];
        let mut counts = [0usize; N];
        for (&r, &b) in residuals.iter().zip(buckets) {
            sums[b] += r;
            counts[b] += 1;
        }

        let observed: Vec<f64> = (0..N)
            .filter(|&b| counts[b] > 0)
            .map(|b| sums[b] / counts[b] as f64)
            .collect();
        let centre = mean_or_zero(&observed);

        let mut effects = [0.0; N];
        for b in 0..N {
            if counts[b] > 0 {
                effects[b] = sums[b] / counts[b] as f64 - centre;
            }
        }
        effects
    }
}

impl ForecastStrategy for SeasonalDecomposition {
    fn model(&self) -> ForecastModel {
        ForecastModel::Seasonal
    }

    fn forecast(&self, history: &SalesHistory, horizon: u32) -> Result<Forecast, ServiceError> {
        let origin = history.first_date();
        let offsets: Vec<f64> = history
            .records()
            .iter()
            .map(|r| (r.date - origin).num_days() as f64)
            .collect();
        let quantities = history.quantities();

        let trend = least_squares(&offsets, &quantities)
            .unwrap_or_else(|| LinearFit::constant(mean_or_zero(&quantities)));

        let mut residuals: Vec<f64> = offsets
            .iter()
            .zip(&quantities)
            .map(|(&t, &y)| y - trend.predict(t))
            .collect();

        let span = history.span_days();
        let weekly_pattern = span >= WEEKLY_MIN_SPAN_DAYS;
        let yearly_pattern = span >= YEARLY_MIN_SPAN_DAYS;

        let weekly: [f64; 7] = if weekly_pattern {
            let weekdays: Vec<usize> = history
                .records()
                .iter()
                .map(|r| r.date.weekday().num_days_from_monday() as usize)
                .collect();
            let effects = Self::bucket_effects::<7>(&residuals, &weekdays);
            for (r, &w) in residuals.iter_mut().zip(&weekdays) {
                *r -= effects[w];
            }
            effects
        } else {
            [0.0; 7]
        };

        let monthly: [f64; 12] = if yearly_pattern {
            let months: Vec<usize> = history.records().iter().map(|r| r.date.month0() as usize).collect();
            let effects = Self::bucket_effects::<12>(&residuals, &months);
            for (r, &m) in residuals.iter_mut().zip(&months) {
                *r -= effects[m];
            }
            effects
        } else {
            [0.0; 12]
        };

        let margin = BAND_Z * population_std(&residuals);

        let points = history
            .future_dates(horizon)?
            .into_iter()
            .map(|date| {
                let t = (date - origin).num_days() as f64;
                let estimate = trend.predict(t)
                    + weekly[date.weekday().num_days_from_monday() as usize]
                    + monthly[date.month0() as usize];
                ForecastPoint::from_estimates(date, estimate, estimate - margin, estimate + margin)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Forecast {
            points,
            seasonality: SeasonalityFlags {
                weekly_pattern,
                yearly_pattern: Some(yearly_pattern),
            },
            model_used: self.model(),
        })
    }
}

/// Calendar features: weekday/7, month/12, day/31, weekend, holiday season
pub fn calendar_features(date: NaiveDate) -> Vec<f64> {
    let weekday = date.weekday().num_days_from_monday();
    let month = date.month();
    vec![
        f64::from(weekday) / 7.0,
        f64::from(month) / 12.0,
        f64::from(date.day()) / 31.0,
        if weekday >= 5 { 1.0 } else { 0.0 },
        if month == 11 || month == 12 { 1.0 } else { 0.0 },
    ]
}

/// Random forest over [`calendar_features`], retrained on every call
#[derive(Debug, Clone)]
pub struct RandomForestStrategy {
    params: ForestParams,
}

impl RandomForestStrategy {
    pub fn new(params: ForestParams) -> Self {
        Self { params }
    }
}

impl ForecastStrategy for RandomForestStrategy {
    fn model(&self) -> ForecastModel {
        ForecastModel::RandomForest
    }

    fn forecast(&self, history: &SalesHistory, horizon: u32) -> Result<Forecast, ServiceError> {
        let rows: Vec<Vec<f64>> = history
            .records()
            .iter()
            .map(|r| calendar_features(r.date))
            .collect();
        let targets = history.quantities();

        let forest = RandomForestRegressor::fit(&rows, &targets, &self.params)?;
        let margin = BAND_Z * population_std(&targets);

        let points = history
            .future_dates(horizon)?
            .into_iter()
            .map(|date| {
                let estimate = forest.predict(&calendar_features(date))?;
                ForecastPoint::from_estimates(date, estimate, estimate - margin, estimate + margin)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Forecast {
            points,
            seasonality: SeasonalityFlags {
                weekly_pattern: true,
                yearly_pattern: None,
            },
            model_used: self.model(),
        })
    }
}

/// Least-squares trend over the sample index with a sinusoidal yearly factor
#[derive(Debug, Default)]
pub struct StatisticalTrend;

impl StatisticalTrend {
    fn season_factor(date: NaiveDate) -> f64 {
        1.0 + 0.1 * (2.0 * PI * f64::from(date.ordinal()) / 365.0).sin()
    }
}

impl ForecastStrategy for StatisticalTrend {
    fn model(&self) -> ForecastModel {
        ForecastModel::Statistical
    }

    fn forecast(&self, history: &SalesHistory, horizon: u32) -> Result<Forecast, ServiceError> {
        let quantities = history.quantities();
        let index: Vec<f64> = (0..quantities.len()).map(|i| i as f64).collect();
        let trend = least_squares(&index, &quantities)
            .unwrap_or_else(|| LinearFit::constant(mean_or_zero(&quantities)));

        let n = quantities.len() as f64;
        let points = history
            .future_dates(horizon)?
            .into_iter()
            .enumerate()
            .map(|(i, date)| {
                let estimate = (trend.predict(n + i as f64) * Self::season_factor(date)).max(0.0);
                ForecastPoint::from_estimates(date, estimate, estimate * 0.7, estimate * 1.3)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Forecast {
            points,
            seasonality: SeasonalityFlags {
                weekly_pattern: true,
                yearly_pattern: Some(true),
            },
            model_used: self.model(),
        })
    }
}

/// Entry point for demand forecasts, configured once at startup
#[derive(Debug, Clone)]
pub struct Forecaster {
    seasonal_engine_enabled: bool,
    fallback_history_days: u32,
    forest: ForestParams,
}

impl Default for Forecaster {
    fn default() -> Self {
        Self::from_config(&ForecastingConfig::default())
    }
}

impl Forecaster {
    pub fn from_config(config: &ForecastingConfig) -> Self {
        Self {
            seasonal_engine_enabled: config.seasonal_engine_enabled,
            fallback_history_days: config.fallback_history_days,
            forest: ForestParams {
                n_trees: config.random_forest_trees,
                seed: config.random_forest_seed,
                max_depth: config.random_forest_max_depth,
                min_samples_split: config.random_forest_min_samples_split,
            },
        }
    }

    pub fn seasonal_engine_enabled(&self) -> bool {
        self.seasonal_engine_enabled
    }

    /// The model that will actually run for a requested one
    pub fn resolve(&self, requested: ForecastModel) -> ForecastModel {
        match requested {
            ForecastModel::Seasonal if !self.seasonal_engine_enabled => ForecastModel::Statistical,
            other => other,
        }
    }

    fn strategy(&self, model: ForecastModel) -> Box<dyn ForecastStrategy> {
        match model {
            ForecastModel::Seasonal => Box::new(SeasonalDecomposition),
            ForecastModel::RandomForest => Box::new(RandomForestStrategy::new(self.forest.clone())),
            ForecastModel::Statistical => Box::new(StatisticalTrend),
        }
    }

    /// Sorted history, or the demo series when `records` is empty
    pub fn prepare_history(&self, records: &[SalesRecord]) -> Result<SalesHistory, ServiceError> {
        if let Some(history) = SalesHistory::new(records.to_vec()) {
            return Ok(history);
        }

        debug!(
            days = self.fallback_history_days,
            "no sales history supplied, using synthetic series"
        );
        let today = Local::now().date_naive();
        SalesHistory::new(synthetic_history(
            self.fallback_history_days,
            today,
            &mut rand::thread_rng(),
        ))
        .ok_or_else(|| ServiceError::InternalError("synthetic history is empty".to_string()))
    }

    /// Forecast `horizon` days past the latest record of `records`
    pub fn predict(
        &self,
        records: &[SalesRecord],
        horizon: u32,
        requested: ForecastModel,
    ) -> Result<Forecast, ServiceError> {
        let history = self.prepare_history(records)?;
        let model = self.resolve(requested);
        if model != requested {
            debug!(%requested, executed = %model, "seasonal engine disabled, falling back");
        }
        self.strategy(model).forecast(&history, horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn series(start: NaiveDate, quantities: &[u64]) -> Vec<SalesRecord> {
        quantities
            .iter()
            .enumerate()
            .map(|(i, &q)| {
                SalesRecord::new(start + chrono::Duration::days(i as i64), q, q as f64 * 10.0)
            })
            .collect()
    }

    fn assert_band(forecast: &Forecast) {
        for p in &forecast.points {
            assert!(p.lower_bound <= p.predicted_quantity, "{p:?}");
            assert!(p.predicted_quantity <= p.upper_bound, "{p:?}");
        }
    }

    #[test]
    fn model_names_parse_with_aliases() {
        assert_eq!(ForecastModel::from_request("prophet"), ForecastModel::Seasonal);
        assert_eq!(ForecastModel::from_request("seasonal"), ForecastModel::Seasonal);
        assert_eq!(ForecastModel::from_request("random_forest"), ForecastModel::RandomForest);
        assert_eq!(ForecastModel::from_request("linear"), ForecastModel::Statistical);
        assert_eq!(ForecastModel::from_request("arima"), ForecastModel::Statistical);
        assert_eq!(ForecastModel::Seasonal.to_string(), "prophet");
        assert_eq!(ForecastModel::RandomForest.to_string(), "random_forest");
        assert_eq!(
            serde_json::to_value(ForecastModel::Seasonal).unwrap(),
            serde_json::json!("prophet")
        );
    }

    #[test]
    fn point_clamps_and_rounds() {
        let p = ForecastPoint::from_estimates(day(2024, 1, 1), 4.6, -3.0, 9.4).unwrap();
        assert_eq!((p.lower_bound, p.predicted_quantity, p.upper_bound), (0, 5, 9));

        let p = ForecastPoint::from_estimates(day(2024, 1, 1), -2.0, -5.0, 1.0).unwrap();
        assert_eq!(p.predicted_quantity, 0);

        assert!(ForecastPoint::from_estimates(day(2024, 1, 1), f64::NAN, 0.0, 1.0).is_err());
        assert!(ForecastPoint::from_estimates(day(2024, 1, 1), 1.0, 0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn history_sorts_stably_by_date() {
        let records = vec![
            SalesRecord::new(day(2024, 3, 2), 1, 0.0),
            SalesRecord::new(day(2024, 3, 1), 2, 0.0),
            SalesRecord::new(day(2024, 3, 2), 3, 0.0),
        ];
        let history = SalesHistory::new(records).unwrap();
        let order: Vec<u64> = history.records().iter().map(|r| r.quantity).collect();
        assert_eq!(order, vec![2, 1, 3]);
        assert_eq!(history.span_days(), 1);
        assert!(SalesHistory::new(Vec::new()).is_none());
    }

    #[test]
    fn synthetic_history_ends_on_requested_day() {
        let mut rng = StdRng::seed_from_u64(7);
        let records = synthetic_history(90, day(2024, 6, 30), &mut rng);
        assert_eq!(records.len(), 90);
        assert_eq!(records[89].date, day(2024, 6, 30));
        assert_eq!(records[0].date, day(2024, 4, 2));
        assert!(records.iter().all(|r| (5..50).contains(&r.quantity)));
        assert!(records.iter().all(|r| (100.0..1000.0).contains(&r.revenue)));
    }

    #[test]
    fn empty_history_forecasts_full_horizon() {
        let forecaster = Forecaster::default();
        for model in [
            ForecastModel::Seasonal,
            ForecastModel::RandomForest,
            ForecastModel::Statistical,
        ] {
            let forecast = forecaster.predict(&[], 30, model).unwrap();
            assert_eq!(forecast.points.len(), 30);
            assert_band(&forecast);
        }
    }

    #[test]
    fn forecast_starts_the_day_after_latest_record() {
        let records = series(day(2024, 2, 1), &[10, 12, 11, 13, 12]);
        let forecast = Forecaster::default()
            .predict(&records, 3, ForecastModel::Statistical)
            .unwrap();
        let dates: Vec<NaiveDate> = forecast.points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![day(2024, 2, 6), day(2024, 2, 7), day(2024, 2, 8)]);
    }

    #[test]
    fn statistical_follows_trend_with_fixed_band() {
        let records = series(day(2023, 1, 1), &[10, 20, 30, 40]);
        let forecast = StatisticalTrend
            .forecast(&SalesHistory::new(records).unwrap(), 1)
            .unwrap();
        let point = &forecast.points[0];
        // index 4 on the trend is 50, scaled by the day-of-year factor for Jan 5
        let expected = 50.0 * (1.0 + 0.1 * (2.0 * PI * 5.0 / 365.0).sin());
        assert_eq!(point.predicted_quantity, expected.round() as u64);
        assert_eq!(point.lower_bound, (expected * 0.7).round() as u64);
        assert_eq!(point.upper_bound, (expected * 1.3).round() as u64);
        assert_eq!(forecast.seasonality.yearly_pattern, Some(true));
    }

    #[test]
    fn statistical_single_record_is_flat() {
        let records = series(day(2023, 3, 20), &[12]);
        let forecast = StatisticalTrend
            .forecast(&SalesHistory::new(records).unwrap(), 2)
            .unwrap();
        assert_eq!(forecast.points.len(), 2);
        assert!(forecast.points.iter().all(|p| (12..=14).contains(&p.predicted_quantity)));
    }

    #[test]
    fn seasonal_recovers_weekday_pattern() {
        // weekends sell 30, weekdays 10, over four weeks starting on a Monday
        let quantities: Vec<u64> = (0..28).map(|i| if i % 7 >= 5 { 30 } else { 10 }).collect();
        let records = series(day(2024, 1, 1), &quantities);
        let forecast = SeasonalDecomposition
            .forecast(&SalesHistory::new(records).unwrap(), 7)
            .unwrap();

        assert!(forecast.seasonality.weekly_pattern);
        assert_eq!(forecast.seasonality.yearly_pattern, Some(false));
        assert_band(&forecast);
        let saturday = forecast
            .points
            .iter()
            .find(|p| p.date.weekday() == chrono::Weekday::Sat)
            .unwrap();
        let tuesday = forecast
            .points
            .iter()
            .find(|p| p.date.weekday() == chrono::Weekday::Tue)
            .unwrap();
        assert_eq!(saturday.predicted_quantity - tuesday.predicted_quantity, 20);
    }

    #[test]
    fn seasonal_short_history_has_no_patterns() {
        let records = series(day(2024, 5, 1), &[5, 6, 7, 8, 9]);
        let forecast = SeasonalDecomposition
            .forecast(&SalesHistory::new(records).unwrap(), 2)
            .unwrap();
        assert!(!forecast.seasonality.weekly_pattern);
        // perfect line: no residual, so the band collapses
        let p = &forecast.points[0];
        assert_eq!((p.lower_bound, p.predicted_quantity, p.upper_bound), (10, 10, 10));
    }

    #[test]
    fn random_forest_is_deterministic() {
        let quantities: Vec<u64> = (0..60).map(|i| 10 + (i % 7) * 3).collect();
        let records = series(day(2024, 1, 1), &quantities);
        let forecaster = Forecaster::default();
        let a = forecaster.predict(&records, 14, ForecastModel::RandomForest).unwrap();
        let b = forecaster.predict(&records, 14, ForecastModel::RandomForest).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.model_used, ForecastModel::RandomForest);
        assert_eq!(a.seasonality.yearly_pattern, None);
        assert_band(&a);
    }

    #[test]
    fn disabled_engine_resolves_to_statistical() {
        let config = ForecastingConfig {
            seasonal_engine_enabled: false,
            ..ForecastingConfig::default()
        };
        let forecaster = Forecaster::from_config(&config);
        assert_eq!(forecaster.resolve(ForecastModel::Seasonal), ForecastModel::Statistical);
        assert_eq!(forecaster.resolve(ForecastModel::RandomForest), ForecastModel::RandomForest);

        let records = series(day(2024, 1, 1), &[3, 4, 5]);
        let forecast = forecaster.predict(&records, 5, ForecastModel::Seasonal).unwrap();
        assert_eq!(forecast.model_used, ForecastModel::Statistical);
    }

    #[test]
    fn calendar_features_flag_weekends_and_holidays() {
        // 2024-12-07 is a Saturday
        let f = calendar_features(day(2024, 12, 7));
        assert_eq!(f, vec![5.0 / 7.0, 1.0, 7.0 / 31.0, 1.0, 1.0]);
        let f = calendar_features(day(2024, 3, 4));
        assert_eq!(f[0], 0.0);
        assert_eq!(f[3], 0.0);
        assert_eq!(f[4], 0.0);
    }

    #[test]
    fn confidence_uses_last_seven_records() {
        assert_eq!(history_confidence(&[]), 0.75);
        let steady = series(day(2024, 1, 1), &[1, 100, 10, 10, 10, 10, 10, 10, 10]);
        assert_eq!(history_confidence(&steady), 1.0);
        let noisy = series(day(2024, 1, 1), &[0, 20]);
        // std 10, mean 10 -> 1 - 10/11
        assert_eq!(history_confidence(&noisy), 0.09);
    }
}
