//! Audit logging and timing around an [`InvoiceValidator`].
//!
//! [`Instrumented`] is composed once around an engine; every call then
//! emits an audit CALL/SUCCESS pair on the `zatca::audit` target, attaches
//! the elapsed time to the result and forwards it to the metrics sink.

use std::sync::Arc;
use std::time::Instant;

use super::metrics::{MetricsSink, VALIDATION_TIME_MS};
use super::result::ValidationResult;
use super::types::{Invoice, InvoiceIdentity};
use super::validation::InvoiceValidator;

/// Wraps a validator with audit logging and timing.
#[derive(Clone)]
pub struct Instrumented<V> {
    inner: V,
    metrics: Option<Arc<dyn MetricsSink>>,
}

impl<V: InvoiceValidator> Instrumented<V> {
    pub fn new(inner: V) -> Self {
        Self {
            inner,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn inner(&self) -> &V {
        &self.inner
    }
}

impl<V: InvoiceValidator> InvoiceValidator for Instrumented<V> {
    fn validate(&self, invoice: &Invoice) -> ValidationResult {
        audit_event("CALL", invoice);
        let start = Instant::now();

        let mut result = self.inner.validate(invoice);

        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
        result.processing_time_ms = Some(elapsed_ms);
        if let Some(metrics) = &self.metrics {
            metrics.record(VALIDATION_TIME_MS, elapsed_ms);
        }

        tracing::debug!(
            target: "zatca::performance",
            invoice = %invoice.invoice_number,
            elapsed_ms,
            "validation completed"
        );
        audit_outcome(&result);
        result
    }
}

/// Emit one audit line for anything attributable to an invoice.
pub fn audit_event(stage: &str, subject: &dyn InvoiceIdentity) {
    tracing::info!(
        target: "zatca::audit",
        stage,
        invoice = subject.invoice_number(),
    );
}

fn audit_outcome(result: &ValidationResult) {
    let status = if result.is_compliant() {
        "COMPLIANT"
    } else {
        "NON_COMPLIANT"
    };
    tracing::info!(
        target: "zatca::audit",
        stage = "SUCCESS",
        invoice = result.invoice_number(),
        status,
        violations = result.violations().len(),
    );
}
