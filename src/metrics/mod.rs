//! Prometheus metrics for probe and group outcomes
//!
//! Call `init_metrics()` once at startup. If it was never called, or
//! registration failed, every recording function is a no-op.

use prometheus::{
    register_counter_vec, register_histogram_vec, CounterVec, Encoder, HistogramVec, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

/// Container for checker metrics
struct CheckerMetrics {
    probe_attempts: CounterVec,
    probe_duration: HistogramVec,
    groups: CounterVec,
}

static CHECKER_METRICS: OnceLock<CheckerMetrics> = OnceLock::new();

/// Outcome of the one registration attempt
static METRICS_INIT: OnceLock<Result<(), String>> = OnceLock::new();

fn register_metrics() -> Result<(), Box<dyn std::error::Error>> {
    let metrics = CheckerMetrics {
        probe_attempts: register_counter_vec!(
            "playcheck_probe_attempts_total",
            "Probe attempts by result (reachable or failure kind)",
            &["result"]
        )?,
        probe_duration: register_histogram_vec!(
            "playcheck_probe_duration_seconds",
            "Duration of a single probe attempt in seconds",
            &["result"],
            vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
        groups: register_counter_vec!(
            "playcheck_groups_total",
            "Channel groups by resolution result",
            &["result"]
        )?,
    };

    CHECKER_METRICS
        .set(metrics)
        .map_err(|_| "Checker metrics already initialized")?;

    tracing::debug!("Prometheus metrics initialized");
    Ok(())
}

/// Register all metrics with the default registry
///
/// Registration runs once; later calls report the first outcome.
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    METRICS_INIT
        .get_or_init(|| register_metrics().map_err(|e| e.to_string()))
        .clone()
        .map_err(Into::into)
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    CHECKER_METRICS.get().is_some()
}

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record one probe attempt; `result` is `reachable` or a failure kind
pub fn record_probe_attempt(result: &str, elapsed: Duration) {
    let Some(m) = CHECKER_METRICS.get() else {
        return;
    };

    m.probe_attempts.with_label_values(&[result]).inc();
    m.probe_duration
        .with_label_values(&[result])
        .observe(elapsed.as_secs_f64());
}

/// Record group outcomes of a run
pub fn record_groups(resolved: usize, dropped: usize, excluded: usize) {
    let Some(m) = CHECKER_METRICS.get() else {
        return;
    };

    for (label, count) in [
        ("resolved", resolved),
        ("dropped", dropped),
        ("excluded", excluded),
    ] {
        if count > 0 {
            m.groups.with_label_values(&[label]).inc_by(count as f64);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_idempotent() {
        assert!(init_metrics().is_ok());
        assert!(init_metrics().is_ok());
        assert!(metrics_initialized());
    }

    #[test]
    fn test_encode_metrics() {
        let _ = init_metrics();
        record_probe_attempt("reachable", Duration::from_millis(20));
        record_groups(2, 1, 0);

        let text = encode_metrics().unwrap();
        assert!(text.contains("playcheck_probe_attempts_total"));
        assert!(text.contains("playcheck_groups_total"));
    }
}
