//! Prometheus metrics for payments-service.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, HistogramVec, TextEncoder,
};

/// Recorded payment counter by payment method.
pub static PAYMENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payments_recorded_total",
        "Total number of recorded payments by payment method",
        &["payment_method"]
    )
    .expect("Failed to register payments_recorded_total")
});

/// Monetary amount counter by payment method.
pub static PAYMENT_AMOUNT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payments_amount_total",
        "Total recorded payment amount by payment method",
        &["payment_method"]
    )
    .expect("Failed to register payments_amount_total")
});

/// Voided payment counter.
pub static VOIDS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payments_voids_total",
        "Total number of voided payments by payment method",
        &["payment_method"]
    )
    .expect("Failed to register payments_voids_total")
});

/// Rejected allocation requests by the rule that failed.
pub static VALIDATION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payments_validation_failures_total",
        "Total number of rejected payment requests by validation rule",
        &["rule"]
    )
    .expect("Failed to register payments_validation_failures_total")
});

/// Error counter for alerting.
pub static ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "payments_errors_total",
        "Total number of errors by type",
        &["error_type"]
    )
    .expect("Failed to register payments_errors_total")
});

/// Database query duration histogram.
pub static DB_QUERY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "payments_db_query_duration_seconds",
        "Database query duration in seconds",
        &["operation"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0]
    )
    .expect("Failed to register payments_db_query_duration_seconds")
});

/// Initialize all metrics (forces lazy initialization).
pub fn init_metrics() {
    Lazy::force(&PAYMENTS_TOTAL);
    Lazy::force(&PAYMENT_AMOUNT_TOTAL);
    Lazy::force(&VOIDS_TOTAL);
    Lazy::force(&VALIDATION_FAILURES_TOTAL);
    Lazy::force(&ERRORS_TOTAL);
    Lazy::force(&DB_QUERY_DURATION);
}

/// Get metrics in Prometheus text format.
pub fn get_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    encoder
        .encode_to_string(&metric_families)
        .unwrap_or_default()
}
