//! Domain metrics for the matching engine.
//!
//! Trimmed from the teacher's `MatchingEngineMetrics` (which also tracked
//! per-instrument book depth and spread, n/a for this single-instrument
//! engine) down to the three series a reader would actually want to alert
//! on: orders received, trades executed, and match latency. Recorded
//! through the `metrics` crate (the same one `observability::init_metrics`
//! wires a Prometheus exporter for) rather than the teacher's hand-rolled
//! atomics, so one exporter picks these up alongside everything else the
//! process emits.

use std::time::Instant;

const ORDERS_RECEIVED: &str = "matching_engine_orders_received_total";
const TRADES_EXECUTED: &str = "matching_engine_trades_executed_total";
const MATCH_LATENCY: &str = "matching_engine_match_latency_seconds";

pub fn record_order_received() {
    metrics::counter!(ORDERS_RECEIVED).increment(1);
}

pub fn record_trade() {
    metrics::counter!(TRADES_EXECUTED).increment(1);
}

/// Started at the top of a mutating operation; records elapsed time on drop.
pub struct MatchLatencyGuard {
    start: Instant,
}

impl MatchLatencyGuard {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Drop for MatchLatencyGuard {
    fn drop(&mut self) {
        metrics::histogram!(MATCH_LATENCY).record(self.start.elapsed().as_secs_f64());
    }
}
