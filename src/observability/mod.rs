//! Observability: structured logging and Prometheus-compatible metrics.
//!
//! The engine never initializes either on its own. Hosts call
//! [`init_logging`] and [`init_metrics`] once at startup; until then all
//! `tracing` events and metric updates are no-ops.

pub mod logging;
pub mod metrics;

pub use logging::{LogFormat, init_logging};
pub use metrics::init_metrics;
