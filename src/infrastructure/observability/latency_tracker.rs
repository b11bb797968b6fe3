//! Wall-clock timing of model calls.

use prometheus::Histogram;
use std::time::{Duration, Instant};

/// Measures one inference and records it into a histogram exactly once,
/// either on [`LatencyGuard::finish`] or on drop (early return, panic unwind).
pub struct LatencyGuard {
    start: Instant,
    histogram: Option<Histogram>,
}

impl LatencyGuard {
    pub fn new(histogram: Histogram) -> Self {
        Self {
            start: Instant::now(),
            histogram: Some(histogram),
        }
    }

    /// Measures without recording anywhere
    pub fn unrecorded() -> Self {
        Self {
            start: Instant::now(),
            histogram: None,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn finish(mut self) -> Duration {
        let elapsed = self.elapsed();
        if let Some(histogram) = self.histogram.take() {
            histogram.observe(elapsed.as_secs_f64());
        }
        elapsed
    }
}

impl Drop for LatencyGuard {
    fn drop(&mut self) {
        if let Some(histogram) = self.histogram.take() {
            histogram.observe(self.elapsed().as_secs_f64());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::HistogramOpts;

    fn histogram() -> Histogram {
        Histogram::with_opts(HistogramOpts::new("test_inference_latency", "test")).unwrap()
    }

    #[test]
    fn test_finish_records_once() {
        let histogram = histogram();

        let guard = LatencyGuard::new(histogram.clone());
        std::thread::sleep(Duration::from_millis(10));
        let elapsed = guard.finish();

        assert!(elapsed >= Duration::from_millis(10));
        assert_eq!(histogram.get_sample_count(), 1);
        assert!(histogram.get_sample_sum() >= 0.01);
    }

    #[test]
    fn test_drop_records_when_not_finished() {
        let histogram = histogram();
        {
            let _guard = LatencyGuard::new(histogram.clone());
        }
        assert_eq!(histogram.get_sample_count(), 1);
    }

    #[test]
    fn test_unrecorded_only_measures() {
        let guard = LatencyGuard::unrecorded();
        assert!(guard.finish() < Duration::from_secs(1));
    }
}
