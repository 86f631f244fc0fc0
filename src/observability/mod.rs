//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! resolver, listener, echo sessions produce:
//!     → logging.rs (structured tracing events, per-connection spans)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON lines)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Every connection gets a span carrying its id and peer address
//! - Metric updates go through the `metrics` facade and are no-ops until an
//!   exporter is installed

pub mod logging;
pub mod metrics;
