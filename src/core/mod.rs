//! Core invoice types, builders and the ZATCA rule engine.
//!
//! This module provides the domain model for Saudi e-invoices, the
//! violation code namespace and the [`Validator`] that maps one invoice to
//! a [`ValidationResult`].

mod builder;
pub mod codes;
mod error;
mod instrument;
mod metrics;
mod result;
mod types;
mod validation;

pub use builder::*;
pub use error::*;
pub use instrument::*;
pub use metrics::*;
pub use result::*;
pub use types::*;
pub use validation::*;
