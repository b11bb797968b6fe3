//! Prometheus metrics definitions for riskserve
//!
//! All metrics use the `riskserve_` prefix and are labelled by model
//! (`liquidity`, `iris`).

use super::latency_tracker::LatencyGuard;
use prometheus::{
    CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
    core::{AtomicF64, GenericGaugeVec},
};
use std::sync::Arc;

/// Prometheus metrics for the prediction service
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    /// Served predictions by model and tier/label
    pub predictions_total: CounterVec,
    /// Failed predictions by model and error kind
    pub prediction_errors_total: CounterVec,
    /// Time spent inside the model call
    pub inference_latency_seconds: HistogramVec,
    /// Model availability (0=unavailable, 1=loaded)
    pub model_loaded: GenericGaugeVec<AtomicF64>,
}

impl Metrics {
    /// Create a new Metrics instance with all gauges and counters registered
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let predictions_total = CounterVec::new(
            Opts::new(
                "riskserve_predictions_total",
                "Total predictions served by model and tier",
            ),
            &["model", "tier"],
        )?;
        registry.register(Box::new(predictions_total.clone()))?;

        let prediction_errors_total = CounterVec::new(
            Opts::new(
                "riskserve_prediction_errors_total",
                "Total failed predictions by model and error kind",
            ),
            &["model", "kind"],
        )?;
        registry.register(Box::new(prediction_errors_total.clone()))?;

        let inference_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "riskserve_inference_latency_seconds",
                "Model inference latency in seconds",
            )
            .buckets(vec![
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1,
            ]),
            &["model"],
        )?;
        registry.register(Box::new(inference_latency_seconds.clone()))?;

        let model_loaded = GaugeVec::new(
            Opts::new(
                "riskserve_model_loaded",
                "Model availability (0=unavailable, 1=loaded)",
            ),
            &["model"],
        )?;
        registry.register(Box::new(model_loaded.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            predictions_total,
            prediction_errors_total,
            inference_latency_seconds,
            model_loaded,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    pub fn inc_predictions(&self, model: &str, tier: &str) {
        self.predictions_total
            .with_label_values(&[model, tier])
            .inc();
    }

    pub fn inc_errors(&self, model: &str, kind: &str) {
        self.prediction_errors_total
            .with_label_values(&[model, kind])
            .inc();
    }

    pub fn set_model_loaded(&self, model: &str, loaded: bool) {
        self.model_loaded
            .with_label_values(&[model])
            .set(if loaded { 1.0 } else { 0.0 });
    }

    /// Starts timing one inference call; recorded when the guard drops
    pub fn inference_timer(&self, model: &str) -> LatencyGuard {
        LatencyGuard::new(self.inference_latency_seconds.with_label_values(&[model]))
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create default Metrics")
    }
}
