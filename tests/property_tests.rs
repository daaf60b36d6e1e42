//! Property-based tests for the analytics models.
//!
//! These tests use proptest to check the invariants every model response
//! must satisfy across a wide range of inputs.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use stateset_insights::ml::{
    segmentation::quintile_scores, CustomerRecord, CustomerSegmenter, ForecastModel, Forecaster,
    PriceObservation, PriceOptimizer, SalesRecord, Segment,
};
use strum::IntoEnumIterator;

fn history_strategy() -> impl Strategy<Value = Vec<SalesRecord>> {
    prop::collection::vec(0u64..500, 0..60).prop_map(|quantities| {
        let start = NaiveDate::from_ymd_opt(2023, 11, 15).unwrap();
        quantities
            .into_iter()
            .enumerate()
            .map(|(offset, quantity)| {
                let date = start.checked_add_days(Days::new(offset as u64)).unwrap();
                SalesRecord::new(date, quantity, quantity as f64 * 12.0)
            })
            .collect()
    })
}

fn model_strategy() -> impl Strategy<Value = ForecastModel> {
    prop_oneof![
        Just(ForecastModel::Seasonal),
        Just(ForecastModel::RandomForest),
        Just(ForecastModel::Statistical),
    ]
}

/// Observations drawn from a noisy constant-elasticity demand curve
fn price_history_strategy() -> impl Strategy<Value = Vec<PriceObservation>> {
    (
        -3.0f64..-0.2,
        prop::collection::vec((5u32..50, 0.9f64..1.1), 0..12),
    )
        .prop_map(|(elasticity, points)| {
            points
                .into_iter()
                .map(|(price, noise)| {
                    let price = f64::from(price);
                    PriceObservation::new(price, 1000.0 * price.powf(elasticity) * noise)
                })
                .collect()
        })
}

fn customer_strategy() -> impl Strategy<Value = Vec<CustomerRecord>> {
    prop::collection::vec((0u32..730, 0u32..100, 0.0f64..10_000.0), 0..40).prop_map(|rows| {
        rows.into_iter()
            .enumerate()
            .map(|(i, (recency_days, frequency, monetary))| CustomerRecord {
                id: format!("c-{i}"),
                recency_days,
                frequency,
                monetary,
            })
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn forecasts_cover_horizon_within_bounds(
        history in history_strategy(),
        horizon in 1u32..45,
        model in model_strategy(),
    ) {
        let forecast = Forecaster::default().predict(&history, horizon, model).unwrap();
        prop_assert_eq!(forecast.points.len(), horizon as usize);
        prop_assert_eq!(forecast.model_used, model);

        for pair in forecast.points.windows(2) {
            prop_assert_eq!(pair[0].date.succ_opt().unwrap(), pair[1].date);
        }
        for point in &forecast.points {
            prop_assert!(point.lower_bound <= point.predicted_quantity, "{:?}", point);
            prop_assert!(point.predicted_quantity <= point.upper_bound, "{:?}", point);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn optimal_price_respects_margin_and_cap(
        current in 5.0f64..50.0,
        cost_share in 0.2f64..0.9,
        history in price_history_strategy(),
    ) {
        let cost = current * cost_share;
        let result = PriceOptimizer::new().optimize(current, cost, &history).unwrap();

        prop_assert!(result.optimal_price >= cost * 1.1, "{:?}", result);
        prop_assert!(result.optimal_price <= current * 2.0, "{:?}", result);
        prop_assert!(result.confidence > 0.0 && result.confidence <= 0.95);
    }

    #[test]
    fn every_customer_lands_in_one_segment(customers in customer_strategy()) {
        let result = CustomerSegmenter::new().segment(&customers);
        let counted: usize = result.segments.iter().map(|s| s.count).sum();
        prop_assert_eq!(counted, customers.len());

        let names: Vec<String> = Segment::iter().map(|s| s.to_string()).collect();
        for summary in &result.segments {
            prop_assert!(names.contains(&summary.name), "unexpected segment {}", summary.name);
            prop_assert!(summary.count > 0);
        }
    }

    #[test]
    fn quintile_scores_stay_in_range(values in prop::collection::vec(-1e6f64..1e6, 0..50)) {
        let scores = quintile_scores(&values, &[1, 2, 3, 4, 5]);
        prop_assert_eq!(scores.len(), values.len());
        prop_assert!(scores.iter().all(|s| (1..=5).contains(s)));
    }
}
