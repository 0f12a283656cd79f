//! Metrics collection and exposition.
//!
//! # Metrics
//! - `auction_requests_total` (counter): submitted auctions
//! - `auction_outcomes_total` (counter): delivered outcomes by `outcome`
//! - `auction_cancellations_total` (counter): connectors stopped by cancel
//! - `auction_round_trip_seconds` (histogram): network exchange latency
//! - `auction_active_connectors` (gauge): connectors not yet retired
//! - `auction_timeout_ms` (gauge): current adaptive timeout

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::auction::AuctionOutcome;

/// Install the Prometheus recorder and serve it on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_submitted() {
    counter!("auction_requests_total").increment(1);
}

pub fn record_outcome(outcome: &AuctionOutcome) {
    counter!("auction_outcomes_total", "outcome" => outcome.label()).increment(1);
}

pub fn record_cancelled(count: usize) {
    counter!("auction_cancellations_total").increment(count as u64);
}

pub fn record_round_trip(elapsed: Duration) {
    histogram!("auction_round_trip_seconds").record(elapsed.as_secs_f64());
}

pub fn record_active_connectors(count: usize) {
    gauge!("auction_active_connectors").set(count as f64);
}

pub fn record_timeout_ms(timeout_ms: u64) {
    gauge!("auction_timeout_ms").set(timeout_ms as f64);
}
