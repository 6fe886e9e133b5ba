//! Prometheus metrics for the identity service.
//!
//! Exposes a standard `/metrics` endpoint that Prometheus can scrape.
//! The gate updates the decision counter on every protected request via
//! `record_decision()`.

use once_cell::sync::Lazy;
use prometheus::{opts, register_counter_vec, CounterVec, Encoder, TextEncoder};

use super::gate::{Operation, Outcome};

/// Registered once in the global default registry.
static GATE_DECISIONS: Lazy<Option<CounterVec>> = Lazy::new(|| {
    match register_counter_vec!(
        opts!(
            "identity_gate_decisions_total",
            "Authorization gate decisions by operation and outcome"
        ),
        &["operation", "outcome"]
    ) {
        Ok(counter) => Some(counter),
        Err(e) => {
            tracing::error!("failed to register identity_gate_decisions_total: {}", e);
            None
        }
    }
});

pub fn record_decision(operation: Operation, outcome: &Outcome) {
    if let Some(counter) = GATE_DECISIONS.as_ref() {
        counter
            .with_label_values(&[operation.as_str(), outcome.label()])
            .inc();
    }
}

/// Encode all registered metrics as Prometheus text format.
/// Called by the `/metrics` HTTP handler.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap_or_default();
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision_count(operation: Operation, outcome_label: &str) -> u64 {
        GATE_DECISIONS
            .as_ref()
            .map(|c| c.with_label_values(&[operation.as_str(), outcome_label]).get() as u64)
            .unwrap_or(0)
    }

    #[test]
    fn test_encode_metrics_returns_valid_text() {
        let output = encode_metrics();
        assert!(output.is_ascii() || output.is_empty());
    }

    #[test]
    fn test_record_decision_increments_counter() {
        let before = decision_count(Operation::DeleteTemplate, "forbidden");
        record_decision(Operation::DeleteTemplate, &Outcome::Forbidden);
        record_decision(Operation::DeleteTemplate, &Outcome::Forbidden);
        assert!(decision_count(Operation::DeleteTemplate, "forbidden") >= before + 2);

        let text = encode_metrics();
        assert!(text.contains("identity_gate_decisions_total"));
        assert!(text.contains("operation=\"delete_template\""));
    }
}
