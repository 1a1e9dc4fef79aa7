use std::time::{Duration, Instant};

use crate::core::ValidationResult;

/// Running counters for a batch in flight.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    expected: Option<usize>,
    processed: usize,
    compliant: usize,
    failed: usize,
    interval: usize,
    started: Instant,
}

impl ProgressTracker {
    /// `expected` is the batch size when known up front; `interval` is how
    /// often [`record`](Self::record) reports a checkpoint.
    pub fn new(expected: Option<usize>, interval: usize) -> Self {
        Self {
            expected,
            processed: 0,
            compliant: 0,
            failed: 0,
            interval,
            started: Instant::now(),
        }
    }

    /// Count one result. Returns true when a checkpoint was reached and a
    /// progress line was logged.
    pub fn record(&mut self, result: &ValidationResult) -> bool {
        self.processed += 1;
        if result.is_compliant() {
            self.compliant += 1;
        } else {
            self.failed += 1;
        }

        let checkpoint = self.interval > 0 && self.processed % self.interval == 0;
        if checkpoint {
            match self.expected {
                Some(total) => tracing::info!(
                    processed = self.processed,
                    total,
                    failed = self.failed,
                    "progress"
                ),
                None => tracing::info!(
                    processed = self.processed,
                    failed = self.failed,
                    "progress"
                ),
            }
        }
        checkpoint
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn compliant(&self) -> usize {
        self.compliant
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Completed share in percent, when the total is known.
    pub fn percent_complete(&self) -> Option<f64> {
        match self.expected {
            Some(0) => Some(100.0),
            Some(total) => Some(self.processed as f64 / total as f64 * 100.0),
            None => None,
        }
    }

    /// Invoices per second so far.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 {
            self.processed as f64 / secs
        } else {
            0.0
        }
    }
}

/// Selects which results a consumer sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultFilter {
    #[default]
    All,
    CompliantOnly,
    FailedOnly,
}

impl ResultFilter {
    pub fn matches(self, result: &ValidationResult) -> bool {
        match self {
            ResultFilter::All => true,
            ResultFilter::CompliantOnly => result.is_compliant(),
            ResultFilter::FailedOnly => !result.is_compliant(),
        }
    }

    pub fn apply<'a, I>(self, results: I) -> impl Iterator<Item = &'a ValidationResult>
    where
        I: IntoIterator<Item = &'a ValidationResult>,
    {
        results.into_iter().filter(move |r| self.matches(r))
    }
}
