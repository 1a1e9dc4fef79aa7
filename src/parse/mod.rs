//! Loading invoices from JSON and UBL 2.1 XML documents.
//!
//! All parsed values pass through the core builders, so a successfully
//! parsed [`Invoice`] always satisfies the model invariants.

mod json;
mod scan;
mod ubl;

pub use json::parse_json;
pub use scan::*;
pub use ubl::parse_ubl;

use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::core::{ComplianceError, Invoice};

/// Errors raised while reading or decoding an invoice document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },

    #[error(transparent)]
    Invalid(#[from] ComplianceError),
}

/// Parse a file, choosing the format from its extension (`.json` or `.xml`).
pub fn parse_file(path: &Path) -> Result<Invoice, ParseError> {
    if !path.exists() {
        return Err(ParseError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let parse: fn(&str) -> Result<Invoice, ParseError> = match extension.as_str() {
        "json" => parse_json,
        "xml" => parse_ubl,
        _ => return Err(ParseError::UnsupportedFormat(format!(".{extension}"))),
    };

    let content = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let invoice = parse(&content)?;
    tracing::debug!(
        path = %path.display(),
        invoice = %invoice.invoice_number,
        "parsed invoice"
    );
    Ok(invoice)
}

/// Load a single invoice file. Alias for [`parse_file`].
pub fn load_invoice(path: impl AsRef<Path>) -> Result<Invoice, ParseError> {
    parse_file(path.as_ref())
}

/// Accepts `YYYY-MM-DDTHH:MM:SS[.f]`, RFC 3339 (offset dropped, local
/// wall time kept) and a bare `YYYY-MM-DD` (midnight).
pub(crate) fn parse_timestamp(field: &'static str, s: &str) -> Result<NaiveDateTime, ParseError> {
    let s = s.trim();
    if let Ok(ts) = NaiveDateTime::from_str(s) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.naive_local());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ParseError::InvalidValue {
            field,
            value: s.to_string(),
        })
}

pub(crate) fn parse_decimal(field: &'static str, s: &str) -> Result<Decimal, ParseError> {
    Decimal::from_str(s.trim()).map_err(|_| ParseError::InvalidValue {
        field,
        value: s.to_string(),
    })
}
