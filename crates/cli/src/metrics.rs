//! Process-wide metrics registry for the command line.

use anyhow::Result;
use once_cell::sync::Lazy;
use prometheus::{Encoder, Registry, TextEncoder};

/// Registry holding every core metric.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    for metric in mangaroute_core::metrics::all_metrics() {
        if let Err(e) = registry.register(metric) {
            tracing::warn!("Failed to register metric: {}", e);
        }
    }
    registry
});

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangaroute_core::metrics::{FALLBACK_EXHAUSTED, MIRROR_ATTEMPTS};

    #[test]
    fn test_encode_includes_core_metrics() {
        MIRROR_ATTEMPTS.with_label_values(&["failed"]).inc();
        FALLBACK_EXHAUSTED.inc();

        let output = encode_metrics().unwrap();

        assert!(output.contains("mangaroute_mirror_attempts_total{result=\"failed\"}"));
        assert!(output.contains("mangaroute_fallback_exhausted_total"));
    }
}
