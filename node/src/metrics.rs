//! # Prometheus Metrics
//!
//! Ledger metrics scraped at `/metrics` on the metrics port. Everything is
//! registered in a dedicated [`prometheus::Registry`] under the `koin`
//! prefix.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Outcome label for a dispatched call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    /// The call ran and, if mutating, reported success.
    Ok,
    /// A transfer or mint that returned `false`.
    Rejected,
    /// The call failed before producing a result.
    Error,
}

impl CallOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            CallOutcome::Ok => "ok",
            CallOutcome::Rejected => "rejected",
            CallOutcome::Error => "error",
        }
    }
}

/// Metric handles for the node. Clones share the underlying series.
#[derive(Clone)]
pub struct NodeMetrics {
    registry: Registry,
    /// Dispatched calls by `entry_point` and `outcome`.
    pub ledger_calls_total: IntCounterVec,
    /// Tokens issued so far, as last observed by the node.
    pub total_supply: IntGauge,
    /// Time spent executing a call, lock wait included.
    pub call_latency_seconds: Histogram,
}

impl NodeMetrics {
    /// Create and register all metrics. Call once at startup.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("koin".into()), None)?;

        let ledger_calls_total = IntCounterVec::new(
            Opts::new("ledger_calls_total", "Ledger calls by entry point and outcome"),
            &["entry_point", "outcome"],
        )?;
        registry.register(Box::new(ledger_calls_total.clone()))?;

        let total_supply = IntGauge::new("total_supply", "Total tokens issued")?;
        registry.register(Box::new(total_supply.clone()))?;

        let call_latency_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "call_latency_seconds",
                "Ledger call execution latency in seconds",
            )
            .buckets(vec![0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]),
        )?;
        registry.register(Box::new(call_latency_seconds.clone()))?;

        Ok(Self {
            registry,
            ledger_calls_total,
            total_supply,
            call_latency_seconds,
        })
    }

    pub fn record_call(&self, entry_point: &str, outcome: CallOutcome) {
        self.ledger_calls_total
            .with_label_values(&[entry_point, outcome.as_str()])
            .inc();
    }

    /// The gauge is an i64; supplies past `i64::MAX` are reported as saturated.
    pub fn set_total_supply(&self, supply: u64) {
        self.total_supply
            .set(i64::try_from(supply).unwrap_or(i64::MAX));
    }

    /// Render all registered metrics in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

pub type SharedMetrics = Arc<NodeMetrics>;

/// `GET /metrics`. Returns 500 if encoding fails.
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calls_are_labelled_by_entry_point_and_outcome() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.record_call("transfer", CallOutcome::Ok);
        metrics.record_call("transfer", CallOutcome::Rejected);
        metrics.record_call("transfer", CallOutcome::Rejected);
        metrics.set_total_supply(1_000);

        let text = metrics.encode().unwrap();
        assert!(text.contains(
            r#"koin_ledger_calls_total{entry_point="transfer",outcome="rejected"} 2"#
        ));
        assert!(text.contains("koin_total_supply 1000"));
    }

    #[test]
    fn supply_gauge_saturates() {
        let metrics = NodeMetrics::new().unwrap();
        metrics.set_total_supply(u64::MAX);
        assert_eq!(metrics.total_supply.get(), i64::MAX);
    }
}
