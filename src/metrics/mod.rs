/*!
 * # Metrics Module
 *
 * In-process metrics for the analytics service.
 *
 * ## Features
 *
 * - HTTP request/response metrics (count, latency, status classes)
 * - Model usage (forecasts per executed model, fallbacks, heuristic prices)
 * - Model run durations
 *
 * ## Metrics Formats
 *
 * Metrics are exposed in the following formats:
 * - Prometheus text format at `/metrics`
 * - JSON format at `/metrics/json`
 */

use axum::{
    extract::{MatchedPath, Request},
    http::header,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ml::{ForecastModel, PricingBasis};

#[derive(Debug, Clone, Default)]
pub struct Counter {
    value: Arc<AtomicU64>,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Integer-valued gauge
#[derive(Debug, Clone, Default)]
pub struct Gauge {
    value: Arc<AtomicU64>,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, value: u64) {
        self.value.store(value, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Count and sum of observed durations. The sum is kept in microseconds.
#[derive(Debug, Clone, Default)]
pub struct Histogram {
    sum_micros: Arc<AtomicU64>,
    count: Arc<AtomicU64>,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, duration: Duration) {
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.sum_micros.fetch_add(micros, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Total observed time in seconds
    pub fn get_sum(&self) -> f64 {
        self.sum_micros.load(Ordering::Relaxed) as f64 / 1_000_000.0
    }
}

/// Prometheus family name of a possibly labelled metric name
fn family(name: &str) -> &str {
    name.split('{').next().unwrap_or(name)
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    counters: DashMap<String, Counter>,
    gauges: DashMap<String, Gauge>,
    histograms: DashMap<String, Histogram>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create_counter(&self, name: &str) -> Counter {
        self.counters
            .entry(name.to_string())
            .or_insert_with(Counter::new)
            .clone()
    }

    pub fn get_or_create_gauge(&self, name: &str) -> Gauge {
        self.gauges
            .entry(name.to_string())
            .or_insert_with(Gauge::new)
            .clone()
    }

    pub fn get_or_create_histogram(&self, name: &str) -> Histogram {
        self.histograms
            .entry(name.to_string())
            .or_insert_with(Histogram::new)
            .clone()
    }

    fn sorted<T: Clone>(map: &DashMap<String, T>) -> BTreeMap<String, T> {
        map.iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Prometheus text exposition, metrics sorted by name
    pub fn export_metrics(&self) -> String {
        let mut output = String::new();
        let mut typed = std::collections::HashSet::new();
        let mut type_line = |output: &mut String, name: &str, kind: &str| {
            let family = family(name).to_string();
            if typed.insert(family.clone()) {
                output.push_str(&format!("# TYPE {} {}\n", family, kind));
            }
        };

        for (name, counter) in Self::sorted(&self.counters) {
            type_line(&mut output, &name, "counter");
            output.push_str(&format!("{} {}\n", name, counter.get()));
        }

        for (name, gauge) in Self::sorted(&self.gauges) {
            type_line(&mut output, &name, "gauge");
            output.push_str(&format!("{} {}\n", name, gauge.get()));
        }

        for (name, histogram) in Self::sorted(&self.histograms) {
            type_line(&mut output, &name, "summary");
            output.push_str(&format!("{}_count {}\n", name, histogram.get_count()));
            output.push_str(&format!("{}_sum {}\n", name, histogram.get_sum()));
        }

        output
    }

    pub fn export_metrics_json(&self) -> serde_json::Value {
        let counters: serde_json::Map<String, serde_json::Value> = Self::sorted(&self.counters)
            .into_iter()
            .map(|(name, counter)| (name, json!(counter.get())))
            .collect();

        let gauges: serde_json::Map<String, serde_json::Value> = Self::sorted(&self.gauges)
            .into_iter()
            .map(|(name, gauge)| (name, json!(gauge.get())))
            .collect();

        let histograms: serde_json::Map<String, serde_json::Value> =
            Self::sorted(&self.histograms)
                .into_iter()
                .map(|(name, histogram)| {
                    (
                        name,
                        json!({
                            "count": histogram.get_count(),
                            "sum": histogram.get_sum(),
                        }),
                    )
                })
                .collect();

        json!({
            "counters": counters,
            "gauges": gauges,
            "histograms": histograms,
        })
    }
}

// Global metrics registry
lazy_static::lazy_static! {
    pub static ref METRICS: MetricsRegistry = MetricsRegistry::new();
}

pub fn increment_counter(name: &str) {
    METRICS.get_or_create_counter(name).inc();
}

pub fn set_gauge(name: &str, value: u64) {
    METRICS.get_or_create_gauge(name).set(value);
}

// HTTP metrics
pub struct HttpMetrics {
    pub requests_total: Counter,
    pub request_duration: Histogram,
    pub status_2xx: Counter,
    pub status_4xx: Counter,
    pub status_5xx: Counter,
}

impl HttpMetrics {
    pub fn new() -> Self {
        Self {
            requests_total: METRICS.get_or_create_counter("http_requests_total"),
            request_duration: METRICS.get_or_create_histogram("http_request_duration_seconds"),
            status_2xx: METRICS.get_or_create_counter("http_status_2xx_total"),
            status_4xx: METRICS.get_or_create_counter("http_status_4xx_total"),
            status_5xx: METRICS.get_or_create_counter("http_status_5xx_total"),
        }
    }

    pub fn record_request(&self, route: &str, duration: Duration, status_code: u16) {
        self.requests_total.inc();
        self.request_duration.observe(duration);
        increment_counter(&format!("http_requests_by_route_total{{route=\"{}\"}}", route));

        match status_code {
            200..=299 => self.status_2xx.inc(),
            400..=499 => self.status_4xx.inc(),
            500..=599 => self.status_5xx.inc(),
            _ => {}
        }
    }
}

impl Default for HttpMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// Model usage metrics
pub struct AnalyticsMetrics {
    pub forecasts_total: Counter,
    pub forecast_fallbacks: Counter,
    pub synthetic_histories: Counter,
    pub forecast_duration: Histogram,
    pub bulk_forecasts_total: Counter,
    pub price_optimizations_total: Counter,
    pub price_heuristics_total: Counter,
    pub price_duration: Histogram,
    pub segmentation_runs_total: Counter,
    pub customers_scored_total: Counter,
    pub segmentation_duration: Histogram,
    pub seasonality_reports_total: Counter,
}

impl AnalyticsMetrics {
    pub fn new() -> Self {
        Self {
            forecasts_total: METRICS.get_or_create_counter("forecasts_total"),
            forecast_fallbacks: METRICS.get_or_create_counter("forecast_model_fallbacks_total"),
            synthetic_histories: METRICS.get_or_create_counter("forecast_synthetic_history_total"),
            forecast_duration: METRICS.get_or_create_histogram("forecast_duration_seconds"),
            bulk_forecasts_total: METRICS.get_or_create_counter("bulk_forecasts_total"),
            price_optimizations_total: METRICS.get_or_create_counter("price_optimizations_total"),
            price_heuristics_total: METRICS.get_or_create_counter("price_heuristics_total"),
            price_duration: METRICS.get_or_create_histogram("price_optimization_duration_seconds"),
            segmentation_runs_total: METRICS.get_or_create_counter("segmentation_runs_total"),
            customers_scored_total: METRICS.get_or_create_counter("customers_scored_total"),
            segmentation_duration: METRICS.get_or_create_histogram("segmentation_duration_seconds"),
            seasonality_reports_total: METRICS.get_or_create_counter("seasonality_reports_total"),
        }
    }

    pub fn record_forecast(
        &self,
        requested: ForecastModel,
        executed: ForecastModel,
        synthetic_history: bool,
        duration: Duration,
    ) {
        self.forecasts_total.inc();
        increment_counter(&format!("forecasts_by_model_total{{model=\"{}\"}}", executed));
        if requested != executed {
            self.forecast_fallbacks.inc();
        }
        if synthetic_history {
            self.synthetic_histories.inc();
        }
        self.forecast_duration.observe(duration);
    }

    pub fn record_price_optimization(&self, basis: PricingBasis, duration: Duration) {
        self.price_optimizations_total.inc();
        if basis != PricingBasis::ElasticityModel {
            self.price_heuristics_total.inc();
        }
        self.price_duration.observe(duration);
    }

    pub fn record_segmentation(&self, customers: usize, duration: Duration) {
        self.segmentation_runs_total.inc();
        self.customers_scored_total.inc_by(customers as u64);
        self.segmentation_duration.observe(duration);
    }
}

impl Default for AnalyticsMetrics {
    fn default() -> Self {
        Self::new()
    }
}

// Global instances
lazy_static::lazy_static! {
    pub static ref HTTP_METRICS: HttpMetrics = HttpMetrics::new();
    pub static ref ANALYTICS_METRICS: AnalyticsMetrics = AnalyticsMetrics::new();
}

/// Middleware recording count, latency and status class of every request
pub async fn track_http_metrics(request: Request, next: Next) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let started = Instant::now();
    let response = next.run(request).await;
    HTTP_METRICS.record_request(&route, started.elapsed(), response.status().as_u16());
    response
}

// HTTP endpoint handlers for metrics
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        METRICS.export_metrics(),
    )
}

pub async fn metrics_json_handler() -> Json<serde_json::Value> {
    Json(METRICS.export_metrics_json())
}

pub fn get_metrics_summary() -> String {
    format!(
        "Requests: {}, 5xx: {}, Forecasts: {}, Price optimizations: {}, Segmentations: {}",
        HTTP_METRICS.requests_total.get(),
        HTTP_METRICS.status_5xx.get(),
        ANALYTICS_METRICS.forecasts_total.get(),
        ANALYTICS_METRICS.price_optimizations_total.get(),
        ANALYTICS_METRICS.segmentation_runs_total.get()
    )
}
