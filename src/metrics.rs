//! Prometheus metrics for the usage service
//!
//! Request counters are updated by the API layer; the sample gauges are
//! updated every time the sampler reads the cgroup.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram_vec, CounterVec, Encoder, Gauge,
    HistogramVec, TextEncoder,
};

lazy_static! {
    // ─────────────────────────────────────────────────────────────────────────────
    // Request Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Requests served, by endpoint suffix (e.g., "resources", "disk-usage")
    pub static ref REQUESTS_TOTAL: CounterVec = register_counter_vec!(
        "climb_usage_requests_total",
        "Total requests served per endpoint",
        &["endpoint"]
    ).expect("failed to register REQUESTS_TOTAL metric");

    /// Requests that ended in a server error, by endpoint suffix
    pub static ref REQUEST_ERRORS_TOTAL: CounterVec = register_counter_vec!(
        "climb_usage_request_errors_total",
        "Requests that failed with a server error per endpoint",
        &["endpoint"]
    ).expect("failed to register REQUEST_ERRORS_TOTAL metric");

    /// Handler latency in seconds, by endpoint suffix
    pub static ref REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "climb_usage_request_duration_seconds",
        "Time spent handling a request",
        &["endpoint"],
        vec![0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1]
    ).expect("failed to register REQUEST_DURATION metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Sample Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Last memory.current reading in bytes
    pub static ref MEMORY_BYTES: Gauge = register_gauge!(
        "climb_usage_memory_bytes",
        "Container memory usage at the last sample"
    ).expect("failed to register MEMORY_BYTES metric");

    /// Last CPU rate (CPUs busy, unscaled by the limit)
    pub static ref CPU_RATE: Gauge = register_gauge!(
        "climb_usage_cpu_rate",
        "CPUs busy between the last two samples"
    ).expect("failed to register CPU_RATE metric");
}

/// Render every registered metric in the Prometheus text format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_touched_metrics() {
        REQUESTS_TOTAL.with_label_values(&["metrics-test"]).inc();
        MEMORY_BYTES.set(1024.0);

        let text = render().unwrap();
        assert!(text.contains("climb_usage_requests_total"));
        assert!(text.contains("metrics-test"));
        assert!(text.contains("climb_usage_memory_bytes"));
    }
}
