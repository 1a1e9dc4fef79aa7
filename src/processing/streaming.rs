//! Sequential and chunked processing for batches too large to hold at once.
//!
//! [`BatchProcessor`] pulls one invoice at a time from a fallible source and
//! keeps only the accumulated results. [`ChunkedProcessor`] materializes
//! at most `chunk_size` invoices and hands each chunk to the worker pool.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::{
    ConcurrentValidator, PROGRESS_INTERVAL, ProcessingError, ProgressTracker, ValidatorFactory,
    run_isolated,
};
use crate::core::codes;
use crate::core::{
    BatchResult, ComplianceError, Instrumented, Invoice, InvoiceValidator, MetricsSink,
    ValidationResult, Validator, ValidatorConfig,
};
use crate::parse::InvoiceSource;

/// Validates a stream of invoices one by one with a single engine.
pub struct BatchProcessor<V = Validator> {
    engine: Instrumented<V>,
}

impl BatchProcessor<Validator> {
    pub fn new(config: ValidatorConfig) -> Self {
        Self::with_validator(Validator::new(config))
    }
}

impl Default for BatchProcessor<Validator> {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl<V: InvoiceValidator> BatchProcessor<V> {
    pub fn with_validator(validator: V) -> Self {
        Self {
            engine: Instrumented::new(validator),
        }
    }

    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.engine = self.engine.with_metrics(metrics);
        self
    }

    /// Consume `source` lazily. Items that fail to load are logged and
    /// skipped; each validated invoice produces exactly one callback.
    pub fn process<I, E, C>(&self, source: I, mut callback: C) -> BatchResult
    where
        I: IntoIterator<Item = Result<Invoice, E>>,
        E: Display,
        C: FnMut(&ValidationResult),
    {
        let start = Instant::now();
        let mut batch = BatchResult::new();
        let mut progress = ProgressTracker::new(None, PROGRESS_INTERVAL);
        let mut skipped = 0usize;

        for item in source {
            let invoice = match item {
                Ok(invoice) => invoice,
                Err(e) => {
                    tracing::error!(error = %e, "skipping invoice that failed to load");
                    skipped += 1;
                    continue;
                }
            };

            let result = run_isolated(&invoice, codes::SYS_SEQUENTIAL_FAULT, || {
                self.engine.validate(&invoice)
            });
            callback(&result);
            progress.record(&result);
            batch.add_result(result);
        }

        batch.processing_time_seconds = start.elapsed().as_secs_f64();
        tracing::info!(
            total = batch.total(),
            compliant = batch.compliant_count(),
            failed = batch.failed_count(),
            skipped,
            seconds = batch.processing_time_seconds,
            "batch processing finished"
        );
        batch
    }

    /// [`process`](Self::process) for an infallible source.
    pub fn process_invoices<I, C>(&self, invoices: I, callback: C) -> BatchResult
    where
        I: IntoIterator<Item = Invoice>,
        C: FnMut(&ValidationResult),
    {
        self.process(
            invoices.into_iter().map(Ok::<_, std::convert::Infallible>),
            callback,
        )
    }

    /// Stream every file in `dir` matching `pattern`. With `output_dir`,
    /// each result is also written to `<output_dir>/<invoice_number>.json`.
    pub fn process_directory(
        &self,
        dir: &Path,
        pattern: &str,
        output_dir: Option<&Path>,
    ) -> Result<BatchResult, ProcessingError> {
        let source = InvoiceSource::scan(dir, pattern)?;
        tracing::info!(
            dir = %dir.display(),
            files = source.len(),
            "streaming invoices"
        );

        if let Some(out) = output_dir {
            fs::create_dir_all(out).map_err(|e| ProcessingError::Output {
                path: out.to_path_buf(),
                source: e,
            })?;
        }

        Ok(self.process(source, |result| {
            if let Some(out) = output_dir {
                if let Err(e) = save_result(out, result) {
                    tracing::error!(error = %e, "failed to write result");
                }
            }
        }))
    }
}

/// Write `result` as pretty JSON to `<dir>/<invoice number>.json`,
/// returning the path written.
pub fn save_result(dir: &Path, result: &ValidationResult) -> Result<PathBuf, ProcessingError> {
    let path = dir.join(format!("{}.json", result_file_stem(&result.invoice_number)));
    serde_json::to_string_pretty(result)
        .map_err(std::io::Error::from)
        .and_then(|json| fs::write(&path, json))
        .map_err(|source| ProcessingError::Output {
            path: path.clone(),
            source,
        })?;
    Ok(path)
}

/// File stem for an invoice's result file. Invoice numbers may contain
/// path separators.
pub fn result_file_stem(invoice_number: &str) -> String {
    invoice_number
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// Splits a stream into fixed-size chunks and validates each on the pool.
pub struct ChunkedProcessor<F = ValidatorConfig> {
    validator: ConcurrentValidator<F>,
    chunk_size: usize,
}

impl ChunkedProcessor<ValidatorConfig> {
    pub fn new(config: ValidatorConfig) -> Self {
        Self::with_validator(ConcurrentValidator::new(config))
    }
}

impl<F: ValidatorFactory> ChunkedProcessor<F> {
    pub const DEFAULT_CHUNK_SIZE: usize = 1000;

    pub fn with_validator(validator: ConcurrentValidator<F>) -> Self {
        Self {
            validator,
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.validator = self.validator.workers(workers);
        self
    }

    /// Validate `source` chunk by chunk. At most `chunk_size` invoices are
    /// held in memory at once; load failures are logged and skipped.
    pub fn process<I, E, C>(
        &self,
        source: I,
        mut callback: C,
    ) -> Result<BatchResult, ComplianceError>
    where
        I: IntoIterator<Item = Result<Invoice, E>>,
        E: Display,
        C: FnMut(&ValidationResult),
    {
        if self.chunk_size == 0 {
            return Err(ComplianceError::Config(
                "chunk size must be at least 1".into(),
            ));
        }

        let start = Instant::now();
        let pool = self.validator.build_pool()?;
        let mut batch = BatchResult::new();
        let mut progress = ProgressTracker::new(None, PROGRESS_INTERVAL);
        let mut source = source.into_iter();
        let mut chunk = Vec::with_capacity(self.chunk_size);
        let mut chunks = 0usize;

        loop {
            chunk.clear();
            for item in source.by_ref() {
                match item {
                    Ok(invoice) => chunk.push(invoice),
                    Err(e) => tracing::error!(error = %e, "skipping invoice that failed to load"),
                }
                if chunk.len() == self.chunk_size {
                    break;
                }
            }
            if chunk.is_empty() {
                break;
            }

            chunks += 1;
            tracing::debug!(chunk = chunks, size = chunk.len(), "validating chunk");
            self.validator
                .dispatch(&pool, &chunk, &mut batch, &mut progress, &mut callback);
        }

        batch.processing_time_seconds = start.elapsed().as_secs_f64();
        tracing::info!(
            total = batch.total(),
            failed = batch.failed_count(),
            chunks,
            seconds = batch.processing_time_seconds,
            "chunked processing finished"
        );
        Ok(batch)
    }

    /// Chunked run over every file in `dir` matching `pattern`.
    pub fn process_directory<C>(
        &self,
        dir: &Path,
        pattern: &str,
        callback: C,
    ) -> Result<BatchResult, ProcessingError>
    where
        C: FnMut(&ValidationResult),
    {
        let source = InvoiceSource::scan(dir, pattern)?;
        Ok(self.process(source, callback)?)
    }
}
