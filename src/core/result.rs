use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{Severity, Violation};
use super::types::InvoiceIdentity;

/// Outcome of validating one invoice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub invoice_number: String,
    pub timestamp: DateTime<Utc>,
    is_compliant: bool,
    violations: Vec<Violation>,
    /// Wall time spent validating, when measured.
    pub processing_time_ms: Option<f64>,
}

impl ValidationResult {
    /// A fresh, compliant result with no violations.
    pub fn new(invoice_number: impl Into<String>) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            timestamp: Utc::now(),
            is_compliant: true,
            violations: Vec::new(),
            processing_time_ms: None,
        }
    }

    /// Placeholder for an invoice whose validation faulted.
    pub fn system_fault(
        invoice_number: impl Into<String>,
        code: &str,
        message: impl Into<String>,
    ) -> Self {
        let mut result = Self::new(invoice_number);
        result.add_violation(Violation::error(
            code,
            "system",
            message,
            super::codes::rules::SYSTEM,
        ));
        result
    }

    /// Append a violation. Any ERROR makes the result non-compliant for good.
    pub fn add_violation(&mut self, violation: Violation) {
        if violation.severity == Severity::Error {
            self.is_compliant = false;
        }
        self.violations.push(violation);
    }

    pub fn is_compliant(&self) -> bool {
        self.is_compliant
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn has_code(&self, code: &str) -> bool {
        self.violations.iter().any(|v| v.code == code)
    }

    /// Violation codes in evaluation order.
    pub fn codes(&self) -> Vec<&str> {
        self.violations.iter().map(|v| v.code.as_str()).collect()
    }
}

impl InvoiceIdentity for ValidationResult {
    fn invoice_number(&self) -> &str {
        &self.invoice_number
    }
}

/// Aggregate outcome of validating many invoices.
///
/// Counters advance only through [`add_result`](Self::add_result), so
/// `total == compliant + failed == results.len()` at every point of a
/// streaming run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    total: usize,
    compliant_count: usize,
    failed_count: usize,
    pub processing_time_seconds: f64,
    results: Vec<ValidationResult>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_result(&mut self, result: ValidationResult) {
        self.total += 1;
        if result.is_compliant() {
            self.compliant_count += 1;
        } else {
            self.failed_count += 1;
        }
        self.results.push(result);
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn compliant_count(&self) -> usize {
        self.compliant_count
    }

    pub fn failed_count(&self) -> usize {
        self.failed_count
    }

    pub fn results(&self) -> &[ValidationResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ValidationResult> {
        self.results
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Share of compliant invoices in percent; 0 for an empty batch.
    pub fn compliance_rate(&self) -> f64 {
        percentage(self.compliant_count, self.total)
    }

    /// Share of non-compliant invoices in percent; 0 for an empty batch.
    pub fn failure_rate(&self) -> f64 {
        percentage(self.failed_count, self.total)
    }

    /// Invoices per second; 0 when no time was recorded.
    pub fn throughput(&self) -> f64 {
        if self.processing_time_seconds > 0.0 {
            self.total as f64 / self.processing_time_seconds
        } else {
            0.0
        }
    }

    /// Non-compliant results in accumulation order.
    pub fn failed(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_compliant())
    }

    /// Map each violation code to the invoice numbers of non-compliant
    /// results carrying it.
    pub fn group_by_violation(&self) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for result in self.failed() {
            for violation in result.violations() {
                map.entry(violation.code.clone())
                    .or_default()
                    .push(result.invoice_number.clone());
            }
        }
        map
    }

    /// Reorder results by invoice number. Concurrent runs accumulate in
    /// completion order; use this when input order matters.
    pub fn sort_by_invoice_number(&mut self) {
        self.results
            .sort_by(|a, b| a.invoice_number.cmp(&b.invoice_number));
    }
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
