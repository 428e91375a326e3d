//! Server-side HTTP metrics, registered into the same default Prometheus registry
//! `submaker_core::metrics` uses so `GET /metrics` exposes both in one text body.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, HistogramVec,
    IntGauge, TextEncoder,
};
use regex::Regex;

pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "submaker_http_requests_total",
        "Total HTTP requests by method, path, and status",
        &["method", "path", "status"]
    )
    .expect("register submaker_http_requests_total")
});

pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "submaker_http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "path", "status"]
    )
    .expect("register submaker_http_request_duration_seconds")
});

pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "submaker_http_requests_in_flight",
        "HTTP requests currently being processed"
    )
    .expect("register submaker_http_requests_in_flight")
});

pub static AUTH_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "submaker_auth_failures_total",
        "Authentication failures by reason",
        &["reason"]
    )
    .expect("register submaker_auth_failures_total")
});

/// Replaces path segments that vary per-request with placeholders so the metric label
/// cardinality stays bounded, following the teacher's `normalize_path`.
pub fn normalize_path(path: &str) -> String {
    static SEASON_EPISODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^/]+:\d+:\d+\.json$").unwrap());
    static OPAQUE_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-zA-Z_.:-]{12,}$").unwrap());

    if SEASON_EPISODE.is_match(path) {
        return SEASON_EPISODE.replace(path, "{id}:{season}:{episode}.json").to_string();
    }

    path.split('/')
        .map(|segment| {
            if segment.is_empty() || !OPAQUE_ID.is_match(segment) {
                segment.to_string()
            } else {
                "{id}".to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub fn init() {
    submaker_core::metrics::init();
    Lazy::force(&HTTP_REQUESTS_TOTAL);
    Lazy::force(&HTTP_REQUEST_DURATION);
    Lazy::force(&HTTP_REQUESTS_IN_FLIGHT);
    Lazy::force(&AUTH_FAILURES_TOTAL);
}

pub fn gather() -> Result<String, prometheus::Error> {
    let metric_families = prometheus::gather();
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&metric_families)
}
