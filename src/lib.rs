//! # zatca-compliance
//!
//! ZATCA (Saudi Arabia) Phase 2 e-invoice compliance checking: business
//! rules, previous-invoice-hash chain integrity and batch validation on a
//! bounded worker pool.
//!
//! All monetary values use [`rust_decimal::Decimal`], never floating point.
//! Rule failures are data ([`Violation`]s on a [`ValidationResult`]), not
//! errors.
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use zatca_compliance::core::*;
//! use rust_decimal_macros::dec;
//!
//! let issued = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(10, 30, 0).unwrap();
//! let address = AddressBuilder::new("King Fahd Road", "Riyadh", "12345", "SA").build().unwrap();
//!
//! let invoice = InvoiceBuilder::new("INV-2024-001", issued)
//!     .seller(PartyBuilder::new("310122393500003", "ABC Trading", address.clone()).build().unwrap())
//!     .buyer(PartyBuilder::new("300000000000003", "XYZ Corp", address).build().unwrap())
//!     .add_line(LineBuilder::new("1", "Laptop", dec!(2), dec!(3000.00)).build().unwrap())
//!     .build()
//!     .unwrap();
//!
//! let validator = Validator::new(ValidatorConfig::default()).with_reference_time(issued);
//! let result = validator.validate(&invoice);
//!
//! // Neither a QR payload nor a previous-invoice hash was supplied.
//! assert!(!result.is_compliant());
//! assert_eq!(result.codes(), vec!["QR_001", "HASH_001"]);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Domain model, builders, rule engine, metrics sinks |
//! | `chain` | SHA-256 previous-invoice-hash chain validation |
//! | `parse` | JSON and UBL 2.1 XML invoice parsing, directory scanning |
//! | `processing` | Concurrent orchestrator, streaming and chunked processors |
//! | `report` | Text summary, CSV and JSON reports |
//! | `all` | Everything above |
//! | `cli` | The `zatca-monitor` binary |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "chain")]
pub mod chain;

#[cfg(feature = "parse")]
pub mod parse;

#[cfg(feature = "processing")]
pub mod processing;

#[cfg(feature = "report")]
pub mod report;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
