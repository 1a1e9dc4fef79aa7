//! Batch validation: a bounded worker pool and a constant-memory streaming
//! processor.
//!
//! Both paths isolate faults per invoice. A panic inside the rule engine is
//! caught and turned into a placeholder [`ValidationResult`] carrying a
//! `SYS_00x` violation, so one bad invoice never takes down the batch.

mod concurrent;
mod progress;
mod streaming;

pub use concurrent::*;
pub use progress::*;
pub use streaming::*;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;

use thiserror::Error;

use crate::core::{ComplianceError, Invoice, ValidationResult};
use crate::parse::ParseError;

/// Log a progress line every this many processed invoices.
pub const PROGRESS_INTERVAL: usize = 100;

/// Errors from directory-level batch operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProcessingError {
    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error(transparent)]
    Source(#[from] ParseError),

    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Run `validate` for one invoice, converting a panic anywhere inside it
/// (engine construction included) into a `code` fault.
pub(crate) fn run_isolated<F>(invoice: &Invoice, code: &str, validate: F) -> ValidationResult
where
    F: FnOnce() -> ValidationResult,
{
    match panic::catch_unwind(AssertUnwindSafe(validate)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(
                invoice = %invoice.invoice_number,
                error = %message,
                "validation faulted"
            );
            ValidationResult::system_fault(
                invoice.invoice_number.clone(),
                code,
                format!("Validation failed: {message}"),
            )
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
