//! Bounded worker-pool orchestrator.
//!
//! Each invoice becomes one task on a dedicated rayon pool. Tasks build a
//! fresh engine from the factory, validate inside a panic guard and send
//! the result back over a channel; the calling thread drains the channel
//! and accumulates in completion order.

use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel;

use super::{PROGRESS_INTERVAL, ProcessingError, ProgressTracker, run_isolated};
use crate::core::codes;
use crate::core::{
    BatchResult, ComplianceError, Instrumented, Invoice, InvoiceValidator, MetricsSink,
    NoopMetrics, ValidationResult, Validator, ValidatorConfig,
};
use crate::parse::InvoiceSource;

/// Builds one engine per task.
///
/// Implemented for [`ValidatorConfig`] (the standard rule engine) and for
/// any `Fn() -> V` closure.
pub trait ValidatorFactory: Sync {
    type Engine: InvoiceValidator;

    fn create(&self) -> Self::Engine;
}

impl ValidatorFactory for ValidatorConfig {
    type Engine = Validator;

    fn create(&self) -> Validator {
        Validator::new(self.clone())
    }
}

impl<F, V> ValidatorFactory for F
where
    F: Fn() -> V + Sync,
    V: InvoiceValidator,
{
    type Engine = V;

    fn create(&self) -> V {
        self()
    }
}

/// Worker count used when none is configured.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
}

/// Validates many invoices on a bounded pool.
pub struct ConcurrentValidator<F = ValidatorConfig> {
    factory: F,
    workers: usize,
    metrics: Arc<dyn MetricsSink>,
}

impl ConcurrentValidator<ValidatorConfig> {
    pub fn new(config: ValidatorConfig) -> Self {
        Self::with_factory(config)
    }
}

impl Default for ConcurrentValidator<ValidatorConfig> {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl<F: ValidatorFactory> ConcurrentValidator<F> {
    pub fn with_factory(factory: F) -> Self {
        Self {
            factory,
            workers: default_workers(),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Upper bound on simultaneously running validations.
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn worker_count(&self) -> usize {
        self.workers
    }

    /// Validate a single invoice with the same isolation a pool task gets.
    pub fn validate_one(&self, invoice: &Invoice) -> ValidationResult {
        run_isolated(invoice, codes::SYS_CONCURRENT_FAULT, || {
            Instrumented::new(self.factory.create())
                .with_metrics(Arc::clone(&self.metrics))
                .validate(invoice)
        })
    }

    pub fn validate_many(&self, invoices: &[Invoice]) -> Result<BatchResult, ComplianceError> {
        self.validate_many_with(invoices, |_| {})
    }

    /// Validate `invoices`, calling `callback` once per result as each
    /// completes.
    ///
    /// The returned batch holds exactly one result per input invoice, in
    /// completion order.
    pub fn validate_many_with<C>(
        &self,
        invoices: &[Invoice],
        mut callback: C,
    ) -> Result<BatchResult, ComplianceError>
    where
        C: FnMut(&ValidationResult),
    {
        let start = Instant::now();
        let mut batch = BatchResult::new();
        if invoices.is_empty() {
            tracing::warn!("no invoices to validate");
            return Ok(batch);
        }

        let pool = self.build_pool()?;
        tracing::info!(
            invoices = invoices.len(),
            workers = self.workers,
            "starting concurrent validation"
        );
        let mut progress = ProgressTracker::new(Some(invoices.len()), PROGRESS_INTERVAL);
        self.dispatch(&pool, invoices, &mut batch, &mut progress, &mut callback);

        batch.processing_time_seconds = start.elapsed().as_secs_f64();
        tracing::info!(
            total = batch.total(),
            compliant = batch.compliant_count(),
            failed = batch.failed_count(),
            seconds = batch.processing_time_seconds,
            "concurrent validation finished"
        );
        Ok(batch)
    }

    /// Scan `dir` for files matching `pattern`, parse them and validate the
    /// invoices that parsed. Unparseable files are logged and skipped.
    pub fn validate_directory<C>(
        &self,
        dir: &Path,
        pattern: &str,
        callback: C,
    ) -> Result<BatchResult, ProcessingError>
    where
        C: FnMut(&ValidationResult),
    {
        let start = Instant::now();
        let invoices: Vec<Invoice> = InvoiceSource::scan(dir, pattern)?.invoices().collect();
        tracing::info!(
            dir = %dir.display(),
            count = invoices.len(),
            "found invoices to validate"
        );

        let mut batch = self.validate_many_with(&invoices, callback)?;
        batch.processing_time_seconds = start.elapsed().as_secs_f64();
        Ok(batch)
    }

    pub(crate) fn build_pool(&self) -> Result<rayon::ThreadPool, ComplianceError> {
        if self.workers == 0 {
            return Err(ComplianceError::Config(
                "worker count must be at least 1".into(),
            ));
        }
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .thread_name(|i| format!("zatca-validate-{i}"))
            .build()
            .map_err(|e| ComplianceError::Pool(e.to_string()))
    }

    /// Run one task per invoice on `pool` and drain results on the calling
    /// thread.
    pub(crate) fn dispatch<C>(
        &self,
        pool: &rayon::ThreadPool,
        invoices: &[Invoice],
        batch: &mut BatchResult,
        progress: &mut ProgressTracker,
        callback: &mut C,
    ) where
        C: FnMut(&ValidationResult),
    {
        let (tx, rx) = channel::unbounded::<ValidationResult>();
        pool.in_place_scope(|scope| {
            for invoice in invoices {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = self.validate_one(invoice);
                    // The receiver lives until every sender is dropped.
                    let _ = tx.send(result);
                });
            }
            drop(tx);

            for result in rx.iter() {
                callback(&result);
                progress.record(&result);
                batch.add_result(result);
            }
        });
    }
}
