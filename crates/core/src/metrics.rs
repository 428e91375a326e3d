//! Prometheus metrics, following the teacher's `metrics.rs`: a single `Lazy`-initialized
//! registry of counters/histograms with a `submaker_` naming prefix, exposed via
//! `gather_metrics()` for the server's `/metrics` handler.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge_vec, CounterVec,
    HistogramVec, IntGaugeVec, TextEncoder,
};

pub static PROVIDER_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "submaker_provider_requests_total",
        "Total provider requests by provider and outcome",
        &["provider", "outcome"]
    )
    .expect("register submaker_provider_requests_total")
});

pub static PROVIDER_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "submaker_provider_request_duration_seconds",
        "Provider request latency in seconds",
        &["provider"]
    )
    .expect("register submaker_provider_request_duration_seconds")
});

pub static CIRCUIT_BREAKER_STATE: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "submaker_circuit_breaker_state",
        "Circuit breaker state per provider (0=closed, 1=open, 2=half-open)",
        &["provider"]
    )
    .expect("register submaker_circuit_breaker_state")
});

pub static LOGIN_COOLDOWN_WAITS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "submaker_login_cooldown_waits_total",
        "Total times a caller waited on the distributed login cooldown",
        &["provider"]
    )
    .expect("register submaker_login_cooldown_waits_total")
});

pub static TRANSLATION_CACHE_HITS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "submaker_translation_cache_hits_total",
        "Translation cache lookups by outcome",
        &["outcome"]
    )
    .expect("register submaker_translation_cache_hits_total")
});

pub static TRANSLATION_SINGLEFLIGHT_JOINED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "submaker_translation_singleflight_joined_total",
        "Total callers that joined an in-flight translation instead of starting a new one",
        &["reason"]
    )
    .expect("register submaker_translation_singleflight_joined_total")
});

pub static DEDUP_RESULTS_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "submaker_dedup_results_dropped_total",
        "Descriptors dropped during dedup/ranking by reason",
        &["reason"]
    )
    .expect("register submaker_dedup_results_dropped_total")
});

pub static STREAM_ACTIVITY_LISTENERS: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "submaker_stream_activity_listeners",
        "Current SSE listener count",
        &["endpoint"]
    )
    .expect("register submaker_stream_activity_listeners")
});

/// Forces initialization of every metric so startup fails fast on a registration conflict
/// instead of on first use, mirroring the teacher's `metrics::init()`.
pub fn init() {
    Lazy::force(&PROVIDER_REQUESTS_TOTAL);
    Lazy::force(&PROVIDER_REQUEST_DURATION_SECONDS);
    Lazy::force(&CIRCUIT_BREAKER_STATE);
    Lazy::force(&LOGIN_COOLDOWN_WAITS_TOTAL);
    Lazy::force(&TRANSLATION_CACHE_HITS_TOTAL);
    Lazy::force(&TRANSLATION_SINGLEFLIGHT_JOINED_TOTAL);
    Lazy::force(&DEDUP_RESULTS_DROPPED_TOTAL);
    Lazy::force(&STREAM_ACTIVITY_LISTENERS);
}

/// Renders the default registry in Prometheus text exposition format.
pub fn gather() -> Result<String, prometheus::Error> {
    let metric_families = prometheus::gather();
    let encoder = TextEncoder::new();
    encoder.encode_to_string(&metric_families)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gather_produces_text_after_init() {
        init();
        PROVIDER_REQUESTS_TOTAL
            .with_label_values(&["opensubtitles-v3", "success"])
            .inc();
        let text = gather().unwrap();
        assert!(text.contains("submaker_provider_requests_total"));
    }
}
