//! Violation code namespace and rule citations.
//!
//! Codes are stable short identifiers grouped by prefix:
//!
//! | Prefix | Concern |
//! |--------|---------|
//! | `REQ_` | structural presence |
//! | `VAT_` | VAT number format |
//! | `DATE_` | issue date bounds |
//! | `LINE_` | line items |
//! | `CALC_` | arithmetic reconciliation |
//! | `QR_` | QR payload |
//! | `HASH_` | previous invoice hash field |
//! | `CHAIN_` | cross-invoice chain break |
//! | `SYS_` | internal processing fault |

pub const REQ_MISSING_FIELD: &str = "REQ_001";

pub const VAT_SELLER_FORMAT: &str = "VAT_001";
pub const VAT_BUYER_FORMAT: &str = "VAT_002";

pub const DATE_IN_FUTURE: &str = "DATE_001";
pub const DATE_TOO_OLD: &str = "DATE_002";

pub const LINE_MISSING: &str = "LINE_001";
pub const LINE_QUANTITY: &str = "LINE_002";
pub const LINE_UNIT_PRICE: &str = "LINE_003";
pub const LINE_UNUSUAL_RATE: &str = "LINE_004";

pub const CALC_SUBTOTAL: &str = "CALC_001";
pub const CALC_TAX: &str = "CALC_002";
pub const CALC_GRAND_TOTAL: &str = "CALC_003";

pub const QR_MISSING: &str = "QR_001";
pub const QR_TOO_SHORT: &str = "QR_002";

pub const HASH_MISSING: &str = "HASH_001";
pub const HASH_FORMAT: &str = "HASH_002";

pub const CHAIN_BROKEN: &str = "CHAIN_001";

/// Fault while validating on the concurrent orchestrator.
pub const SYS_CONCURRENT_FAULT: &str = "SYS_001";
/// Fault while validating on the sequential batch processor.
pub const SYS_SEQUENTIAL_FAULT: &str = "SYS_002";

/// Regulation citations, indexed by rule number.
pub mod rules {
    pub const REQUIRED_FIELDS: &str = "ZATCA-BR-01";
    pub const SELLER_VAT: &str = "ZATCA-BR-02";
    pub const BUYER_VAT: &str = "ZATCA-BR-03";
    pub const FUTURE_DATE: &str = "ZATCA-BR-04";
    pub const INVOICE_AGE: &str = "ZATCA-BR-05";
    pub const HAS_LINES: &str = "ZATCA-BR-06";
    pub const POSITIVE_QUANTITY: &str = "ZATCA-BR-07";
    pub const NON_NEGATIVE_PRICE: &str = "ZATCA-BR-08";
    pub const VAT_RATE: &str = "ZATCA-BR-09";
    pub const SUBTOTAL: &str = "ZATCA-BR-10";
    pub const TAX_TOTAL: &str = "ZATCA-BR-11";
    pub const GRAND_TOTAL: &str = "ZATCA-BR-12";
    pub const QR_PRESENT: &str = "ZATCA-BR-13";
    pub const QR_FORMAT: &str = "ZATCA-BR-14";
    pub const PIH_PRESENT: &str = "ZATCA-BR-15";
    pub const PIH_FORMAT: &str = "ZATCA-BR-16";
    pub const CHAIN: &str = "ZATCA-BR-17";
    pub const SYSTEM: &str = "ZATCA-SYS";
}
