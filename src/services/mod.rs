//! Services wrapping the models with logging, metrics and response shaping.

pub mod forecasting;
pub mod pricing;
pub mod seasonality;
pub mod segmentation;

use std::sync::Arc;

use crate::config::ForecastingConfig;
use crate::ml::Forecaster;

/// Services layer used by the HTTP handlers
#[derive(Debug, Clone)]
pub struct AnalyticsServices {
    pub forecasting: Arc<forecasting::ForecastingService>,
    pub pricing: Arc<pricing::PricingService>,
    pub segmentation: Arc<segmentation::SegmentationService>,
    pub seasonality: Arc<seasonality::SeasonalityService>,
}

impl AnalyticsServices {
    /// Build every service from the startup forecasting configuration
    pub fn new(config: &ForecastingConfig) -> Self {
        Self {
            forecasting: Arc::new(forecasting::ForecastingService::new(
                Forecaster::from_config(config),
            )),
            pricing: Arc::new(pricing::PricingService::new()),
            segmentation: Arc::new(segmentation::SegmentationService::new()),
            seasonality: Arc::new(seasonality::SeasonalityService::new()),
        }
    }
}
