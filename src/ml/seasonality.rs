//! Monthly seasonality profiles, either the built-in baseline or derived from
//! a sales history.

use crate::ml::forecasting::SalesRecord;
use crate::ml::regression::{mean_or_zero, round_to};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const PEAK_THRESHOLD: f64 = 1.1;
const SLOW_THRESHOLD: f64 = 0.9;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyIndex {
    #[schema(example = "Jan")]
    pub month: String,
    /// Demand relative to an average month
    #[schema(example = 0.85)]
    pub index: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalitySource {
    Baseline,
    Historical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SeasonalityReport {
    pub source: SeasonalitySource,
    pub monthly_indices: Vec<MonthlyIndex>,
    pub peak_seasons: Vec<String>,
    pub recommendations: Vec<String>,
}

fn to_monthly(indices: &[f64; 12]) -> Vec<MonthlyIndex> {
    MONTH_NAMES
        .iter()
        .zip(indices)
        .map(|(name, &index)| MonthlyIndex {
            month: name.to_string(),
            index,
        })
        .collect()
}

/// Retail profile used when no history is available: summer and the holiday
/// season run hot, January and February run cold.
pub fn baseline_report() -> SeasonalityReport {
    let indices = [0.85, 0.85, 1.0, 1.0, 1.0, 1.2, 1.2, 1.2, 1.0, 1.0, 1.2, 1.2];
    SeasonalityReport {
        source: SeasonalitySource::Baseline,
        monthly_indices: to_monthly(&indices),
        peak_seasons: vec![
            "Summer (Jun-Aug)".to_string(),
            "Holiday Season (Nov-Dec)".to_string(),
        ],
        recommendations: vec![
            "Increase inventory for summer months".to_string(),
            "Plan promotions for slower months (Jan-Feb)".to_string(),
            "Holiday season requires 2x normal inventory".to_string(),
        ],
    }
}

/// Mean quantity per calendar month divided by the mean of the observed
/// monthly means, rounded to 2 decimals. Months without data get 1.0.
/// `None` for an empty history.
pub fn monthly_indices(records: &[SalesRecord]) -> Option<[f64; 12]> {
    if records.is_empty() {
        return None;
    }

    let mut sums = [0.0; 12];
    let mut counts = [0usize; 12];
    for record in records {
        let month = record.date.month0() as usize;
        sums[month] += record.quantity as f64;
        counts[month] += 1;
    }

    let monthly_means: Vec<Option<f64>> = (0..12)
        .map(|m| (counts[m] > 0).then(|| sums[m] / counts[m] as f64))
        .collect();
    let observed: Vec<f64> = monthly_means.iter().flatten().copied().collect();
    let overall = mean_or_zero(&observed);

    let mut indices = [1.0; 12];
    if overall > 0.0 {
        for (slot, mean) in indices.iter_mut().zip(&monthly_means) {
            if let Some(mean) = mean {
                *slot = round_to(mean / overall, 2);
            }
        }
    }
    Some(indices)
}

/// Index of a single month (1-12), 1.0 when it cannot be derived
pub fn month_index(records: &[SalesRecord], month: u32) -> f64 {
    match (monthly_indices(records), month) {
        (Some(indices), 1..=12) => indices[month as usize - 1],
        _ => 1.0,
    }
}

/// Seasonality derived from `records`, or the baseline for an empty history
pub fn report_from_history(records: &[SalesRecord]) -> SeasonalityReport {
    let Some(indices) = monthly_indices(records) else {
        return baseline_report();
    };

    let months_where = |keep: fn(f64) -> bool| -> Vec<String> {
        MONTH_NAMES
            .iter()
            .zip(&indices)
            .filter(|(_, &index)| keep(index))
            .map(|(name, _)| name.to_string())
            .collect()
    };
    let peaks = months_where(|index| index >= PEAK_THRESHOLD);
    let slow = months_where(|index| index <= SLOW_THRESHOLD);

    let mut recommendations = Vec::new();
    if !peaks.is_empty() {
        recommendations.push(format!(
            "Increase inventory ahead of peak months ({})",
            peaks.join(", ")
        ));
    }
    if !slow.is_empty() {
        recommendations.push(format!(
            "Plan promotions for slower months ({})",
            slow.join(", ")
        ));
    }
    if recommendations.is_empty() {
        recommendations
            .push("Demand is steady across observed months - keep regular stock levels".to_string());
    }

    SeasonalityReport {
        source: SeasonalitySource::Historical,
        monthly_indices: to_monthly(&indices),
        peak_seasons: peaks,
        recommendations,
    }
}
