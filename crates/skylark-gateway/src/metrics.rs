//! Prometheus metrics for the Flight SQL dispatch surface.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_int_gauge, CounterVec, Encoder, IntGauge, TextEncoder,
};

/// Dispatched commands by entry point and outcome.
pub static DISPATCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "skylark_dispatch_total",
        "Dispatched Flight SQL calls by entry point and outcome",
        &["entry_point", "outcome"]
    )
    .unwrap()
});

/// Currently open prepared statements.
pub static PREPARED_STATEMENTS_OPEN: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "skylark_prepared_statements_open",
        "Prepared statements currently registered"
    )
    .unwrap()
});

/// Touch all lazy statics so they register before the first scrape.
pub fn init_metrics() {
    let _ = &*DISPATCH_TOTAL;
    let _ = &*PREPARED_STATEMENTS_OPEN;
}

pub fn record_dispatch(entry_point: &str, outcome: &str) {
    DISPATCH_TOTAL
        .with_label_values(&[entry_point, outcome])
        .inc();
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_counter_increments() {
        init_metrics();
        record_dispatch("do_get", "ok");
        let rendered = encode_metrics();
        assert!(rendered.contains("skylark_dispatch_total"));
    }
}
