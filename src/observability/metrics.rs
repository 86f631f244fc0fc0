//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tgw_resolutions_total` (counter): outcomes by `outcome` label
//!   (`stripped`, `legacy`, `malformed`, `io`, `closed`, `cancelled`)
//! - `tgw_resolution_duration_seconds` (histogram): time from first read to outcome
//! - `tgw_leftover_bytes` (histogram): payload bytes already buffered at resolution
//! - `tgw_active_connections` (gauge): connections currently open
//! - `tgw_echoed_bytes_total` (counter): bytes written back by echo sessions

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus exporter with an HTTP scrape listener.
///
/// Must run inside a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_resolution(outcome: &'static str, started: Instant) {
    ::metrics::counter!("tgw_resolutions_total", "outcome" => outcome).increment(1);
    ::metrics::histogram!("tgw_resolution_duration_seconds", "outcome" => outcome)
        .record(started.elapsed().as_secs_f64());
}

pub fn record_leftover(bytes: usize) {
    ::metrics::histogram!("tgw_leftover_bytes").record(bytes as f64);
}

pub fn set_active_connections(count: u64) {
    ::metrics::gauge!("tgw_active_connections").set(count as f64);
}

pub fn record_echoed(bytes: u64) {
    ::metrics::counter!("tgw_echoed_bytes_total").increment(bytes);
}
