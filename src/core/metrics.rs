//! Metrics sinks handed explicitly to validators and processors.

use std::collections::HashMap;

use parking_lot::Mutex;

/// Metric name under which per-invoice validation time is recorded.
pub const VALIDATION_TIME_MS: &str = "invoice_validation_ms";

/// Receives numeric samples from concurrent writers.
///
/// Implementations must be safe to call from many worker threads at once.
#[allow(unused_variables)]
pub trait MetricsSink: Send + Sync {
    fn record(&self, metric: &str, value: f64) {}
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {}

/// Summary statistics for one metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricStats {
    pub count: usize,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Keeps every sample in memory behind a single lock.
#[derive(Debug, Default)]
pub struct InMemoryMetrics {
    samples: Mutex<HashMap<String, Vec<f64>>>,
}

impl InMemoryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self, metric: &str) -> Option<MetricStats> {
        let samples = self.samples.lock();
        let values = samples.get(metric).filter(|v| !v.is_empty())?;
        let sum: f64 = values.iter().sum();
        Some(MetricStats {
            count: values.len(),
            avg: sum / values.len() as f64,
            min: values.iter().copied().fold(f64::INFINITY, f64::min),
            max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        })
    }

    pub fn count(&self, metric: &str) -> usize {
        self.samples.lock().get(metric).map_or(0, Vec::len)
    }
}

impl MetricsSink for InMemoryMetrics {
    fn record(&self, metric: &str, value: f64) {
        self.samples
            .lock()
            .entry(metric.to_string())
            .or_default()
            .push(value);
    }
}
