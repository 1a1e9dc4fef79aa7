use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while constructing invoices or configuring processors.
///
/// Business-rule failures are never reported through this type; they are
/// [`Violation`]s attached to a [`ValidationResult`](super::ValidationResult).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ComplianceError {
    /// A construction invariant of the domain model was violated.
    #[error("builder error: {0}")]
    Builder(String),

    /// Invalid processor configuration (worker count, chunk size, ...).
    #[error("configuration error: {0}")]
    Config(String),

    /// The worker pool could not be created.
    #[error("worker pool error: {0}")]
    Pool(String),
}

/// How much a violation weighs on compliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Makes the invoice non-compliant.
    Error,
    /// Advisory only (unless strict mode elevates it).
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single compliance finding with field path and rule citation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// Stable short identifier (e.g. "VAT_001").
    pub code: String,
    pub severity: Severity,
    /// Dot-separated path to the offending field (e.g. "lines[0].quantity").
    pub field: String,
    /// Human-readable description.
    pub message: String,
    /// Regulation citation (e.g. "ZATCA-BR-02").
    pub rule: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} {}: {} ({})",
            self.code, self.severity, self.field, self.message, self.rule
        )
    }
}

impl Violation {
    pub fn new(
        code: impl Into<String>,
        severity: Severity,
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            severity,
            field: field.into(),
            message: message.into(),
            rule: rule.into(),
        }
    }

    /// Create an ERROR-severity violation.
    pub fn error(
        code: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self::new(code, Severity::Error, field, message, rule)
    }

    /// Create a WARNING-severity violation.
    pub fn warning(
        code: impl Into<String>,
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self::new(code, Severity::Warning, field, message, rule)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}
