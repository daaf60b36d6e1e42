use tracing::info;

use crate::{
    metrics::ANALYTICS_METRICS,
    ml::{seasonality, SalesRecord, SeasonalityReport},
};

#[derive(Debug, Clone, Default)]
pub struct SeasonalityService;

impl SeasonalityService {
    pub fn new() -> Self {
        Self
    }

    /// The built-in retail seasonality profile
    pub async fn baseline(&self) -> SeasonalityReport {
        ANALYTICS_METRICS.seasonality_reports_total.inc();
        seasonality::baseline_report()
    }

    /// Seasonality derived from a sales history
    pub async fn from_history(&self, history: Vec<SalesRecord>) -> SeasonalityReport {
        info!(records = history.len(), "Analyzing seasonality");
        ANALYTICS_METRICS.seasonality_reports_total.inc();
        seasonality::report_from_history(&history)
    }
}
