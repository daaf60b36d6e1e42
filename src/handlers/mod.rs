pub mod common;
pub mod forecasting;
pub mod pricing;
pub mod seasonality;
pub mod segmentation;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;
