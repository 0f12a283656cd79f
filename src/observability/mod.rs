//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! registry / connector / dispatcher produce:
//!     → logging.rs (tracing events, one span per auction)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout log stream
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Metric updates are no-ops until a recorder is installed
//! - Log level configurable via config and `RUST_LOG`

pub mod logging;
pub mod metrics;

pub use self::logging::init_logging;
pub use self::metrics::init_metrics;
