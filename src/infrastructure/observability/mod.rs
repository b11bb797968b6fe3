//! Pull-based observability for riskserve
//!
//! Counters and histograms live in a private Prometheus registry and are
//! rendered in text format by the HTTP `/metrics` route. Structured logs go
//! through `tracing`.

pub mod latency_tracker;
pub mod metrics;

pub use latency_tracker::LatencyGuard;
pub use metrics::Metrics;
