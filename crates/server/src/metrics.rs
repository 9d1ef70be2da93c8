use std::sync::Mutex;

use axum::http::StatusCode;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter, register_int_gauge, Encoder, IntCounter, IntGauge, TextEncoder};

// Prometheus metrics (default registry)
pub static VISITS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "visit_counter_visits_total",
        "Successful increments served by /visit since process start"
    )
    .expect("register visits_total")
});

pub static READS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "visit_counter_reads_total",
        "Successful reads served by /count since process start"
    )
    .expect("register reads_total")
});

pub static STORAGE_ERRORS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "visit_counter_storage_errors_total",
        "Requests that failed because the counter record was unavailable or malformed"
    )
    .expect("register storage_errors_total")
});

pub static CURRENT_COUNT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "visit_counter_current_count",
        "Last persisted visit count observed by this process"
    )
    .expect("register current_count")
});

// Highest count seen so far; responses finish out of order, the persisted count never drops.
static HIGHEST_COUNT: Mutex<u64> = Mutex::new(0);

/// Raise `visit_counter_current_count` to `count`; lower values are ignored.
pub fn observe_count(count: u64) {
    let mut highest = HIGHEST_COUNT.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if count > *highest {
        *highest = count;
        CURRENT_COUNT.set(i64::try_from(count).unwrap_or(i64::MAX));
    }
}

pub fn encode_metrics() -> (StatusCode, String) {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("metrics encode error: {e}"),
        );
    }
    (
        StatusCode::OK,
        String::from_utf8(buffer).unwrap_or_default(),
    )
}

pub async fn metrics_handler() -> (StatusCode, String) {
    encode_metrics()
}
