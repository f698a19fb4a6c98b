//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Mirror fallback (attempts, switches, exhaustion)
//! - API requests (duration per operation)
//! - Search (results per query)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Mirror Fallback Metrics
// =============================================================================

/// Attempts against a single mirror by result.
pub static MIRROR_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mangaroute_mirror_attempts_total",
            "Total request attempts against a mirror",
        ),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Mirror switches caused by failures.
pub static MIRROR_SWITCHES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mangaroute_mirror_switches_total",
        "Total switches to a fallback mirror",
    )
    .unwrap()
});

/// Requests that failed on every configured mirror.
pub static FALLBACK_EXHAUSTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mangaroute_fallback_exhausted_total",
        "Total requests that exhausted every mirror",
    )
    .unwrap()
});

// =============================================================================
// API Metrics
// =============================================================================

/// Duration of a full fallback-wrapped API operation.
pub static API_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mangaroute_api_request_duration_seconds",
            "Duration of mirror API operations including fallback",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
        &["operation"], // "search", "series_info", "chapter_page"
    )
    .unwrap()
});

/// Search hits returned per query.
pub static SEARCH_RESULTS: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mangaroute_search_results",
            "Number of search hits returned per query",
        )
        .buckets(vec![0.0, 1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Mirror fallback
        Box::new(MIRROR_ATTEMPTS.clone()),
        Box::new(MIRROR_SWITCHES.clone()),
        Box::new(FALLBACK_EXHAUSTED.clone()),
        // API
        Box::new(API_REQUEST_DURATION.clone()),
        Box::new(SEARCH_RESULTS.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        MIRROR_ATTEMPTS.with_label_values(&["success"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "mangaroute_mirror_attempts_total"));
    }
}
