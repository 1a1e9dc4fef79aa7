//! Human- and machine-readable renderings of batch results.
//!
//! Renderers return strings; writing them to disk is left to the caller.

mod csv;
mod json;
mod summary;

pub use csv::csv_report;
pub use json::{json_report, result_json};
pub use summary::summary_report;
