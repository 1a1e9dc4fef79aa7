//! Previous-invoice-hash chain integrity.
//!
//! Every invoice after the first must declare, as its PIH, the SHA-256 of
//! the invoice immediately before it. [`ChainValidator`] checks this as a
//! left-to-right fold holding only the running hash; the caller supplies
//! invoices already in chronological order.
//!
//! ```
//! # use chrono::NaiveDate;
//! # use rust_decimal_macros::dec;
//! # use zatca_compliance::core::*;
//! use zatca_compliance::chain::{compute_hash, validate_chain};
//!
//! # let address = AddressBuilder::new("Street", "Riyadh", "12345", "SA").build().unwrap();
//! # let party = PartyBuilder::new("310122393500003", "Seller", address).build().unwrap();
//! # let at = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(10, 30, 0).unwrap();
//! # let line = LineBuilder::new("1", "Item", dec!(1), dec!(100)).build().unwrap();
//! let first = InvoiceBuilder::new("INV-1", at)
//!     .seller(party.clone()).buyer(party.clone()).add_line(line.clone())
//!     .build().unwrap();
//! let second = InvoiceBuilder::new("INV-2", at)
//!     .seller(party.clone()).buyer(party).add_line(line)
//!     .previous_invoice_hash(compute_hash(&first))
//!     .build().unwrap();
//!
//! assert!(validate_chain(&[first, second]).is_empty());
//! ```

use sha2::{Digest, Sha256};

use crate::core::codes::{self, rules};
use crate::core::{Invoice, Violation, iso_timestamp};

/// Canonical string hashed for an invoice:
/// `"{invoice_number}|{issue_date ISO 8601}|{grand_total}"`.
pub fn hash_input(invoice: &Invoice) -> String {
    format!(
        "{}|{}|{}",
        invoice.invoice_number,
        iso_timestamp(&invoice.issue_date),
        invoice.grand_total()
    )
}

/// Lower-case hex SHA-256 of [`hash_input`].
pub fn compute_hash(invoice: &Invoice) -> String {
    let digest = Sha256::digest(hash_input(invoice).as_bytes());
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Streaming chain checker.
#[derive(Debug, Clone, Default)]
pub struct ChainValidator {
    last_hash: Option<String>,
}

impl ChainValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash of the most recently pushed invoice.
    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    /// Feed the next invoice in order. The first invoice only seeds the
    /// running hash; each later one is checked against it.
    pub fn push(&mut self, invoice: &Invoice) -> Option<Violation> {
        let current = compute_hash(invoice);
        match self.last_hash.replace(current) {
            None => None,
            Some(expected) if invoice.previous_invoice_hash.as_deref() == Some(expected.as_str()) => {
                None
            }
            Some(expected) => {
                tracing::debug!(
                    invoice = %invoice.invoice_number,
                    expected = %expected,
                    declared = ?invoice.previous_invoice_hash,
                    "hash chain broken"
                );
                Some(Violation::error(
                    codes::CHAIN_BROKEN,
                    "previous_invoice_hash",
                    format!("Invoice {}: Hash chain broken", invoice.invoice_number),
                    rules::CHAIN,
                ))
            }
        }
    }
}

/// Check a chronologically ordered sequence; one `CHAIN_001` per break.
pub fn validate_chain<'a, I>(invoices: I) -> Vec<Violation>
where
    I: IntoIterator<Item = &'a Invoice>,
{
    let mut chain = ChainValidator::new();
    invoices
        .into_iter()
        .filter_map(|invoice| chain.push(invoice))
        .collect()
}
