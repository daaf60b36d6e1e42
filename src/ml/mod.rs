/*!
 * # Analytics Models
 *
 * The statistical core of the service. Every model is stateless: it is fitted
 * on the data of a single request and discarded afterwards.
 *
 * - [`forecasting`]: demand forecasts with seasonal, random forest and
 *   statistical strategies
 * - [`pricing`]: elasticity based price optimization
 * - [`segmentation`]: RFM customer segmentation
 * - [`seasonality`]: monthly seasonality profiles
 */

pub mod forecasting;
pub mod pricing;
pub mod random_forest;
pub mod regression;
pub mod seasonality;
pub mod segmentation;

pub use forecasting::{
    Forecast, ForecastModel, ForecastPoint, Forecaster, SalesRecord, SeasonalityFlags,
};
pub use pricing::{PriceObservation, PriceOptimization, PriceOptimizer, PricingBasis, ProjectionPair};
pub use seasonality::{MonthlyIndex, SeasonalityReport, SeasonalitySource};
pub use segmentation::{CustomerRecord, CustomerSegmenter, Segment, SegmentSummary, SegmentationResult};
