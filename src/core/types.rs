use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Postal address of a party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub building_number: Option<String>,
    /// Saudi national address additional number.
    pub additional_number: Option<String>,
    pub city: String,
    pub postal_code: String,
    /// ISO 3166-1 alpha-2, always upper case.
    pub country_code: String,
}

/// Seller or buyer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Party {
    /// 15-digit VAT registration number.
    pub vat_number: String,
    pub name: String,
    pub address: Address,
}

/// Invoice line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub id: String,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    /// VAT rate in percent (0..=100).
    pub tax_percent: Decimal,
    pub discount: Decimal,
}

impl Line {
    /// `quantity * unit_price - discount`.
    pub fn subtotal(&self) -> Decimal {
        self.quantity * self.unit_price - self.discount
    }

    /// `subtotal * tax_percent / 100`.
    pub fn tax_amount(&self) -> Decimal {
        self.subtotal() * (self.tax_percent / Decimal::ONE_HUNDRED)
    }

    /// `subtotal + tax_amount`.
    pub fn total(&self) -> Decimal {
        self.subtotal() + self.tax_amount()
    }
}

/// UNTDID 1001 invoice type codes accepted by ZATCA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvoiceTypeCode {
    /// 388: Tax invoice.
    Standard,
    /// 381: Credit note.
    CreditNote,
    /// 383: Debit note.
    DebitNote,
}

impl InvoiceTypeCode {
    /// UNTDID 1001 numeric code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Standard => 388,
            Self::CreditNote => 381,
            Self::DebitNote => 383,
        }
    }

    /// Parse from UNTDID 1001 numeric code.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            388 => Some(Self::Standard),
            381 => Some(Self::CreditNote),
            383 => Some(Self::DebitNote),
            _ => None,
        }
    }
}

/// Totals as stated on the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclaredTotals {
    pub subtotal: Decimal,
    pub total_tax: Decimal,
    pub grand_total: Decimal,
}

/// A complete invoice.
///
/// Constructed once (normally via [`InvoiceBuilder`](super::InvoiceBuilder))
/// and treated as read-only by validation and processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub issue_date: NaiveDateTime,
    pub invoice_type: InvoiceTypeCode,
    pub seller: Party,
    pub buyer: Party,
    pub lines: Vec<Line>,
    /// PIH: hash of the preceding invoice in the seller's sequence.
    pub previous_invoice_hash: Option<String>,
    /// Base64 TLV payload of the invoice QR code.
    pub qr_code: Option<String>,
    pub cryptographic_stamp: Option<String>,
    /// Totals stated on the document, if the source carried them.
    pub declared_totals: Option<DeclaredTotals>,
}

impl Invoice {
    /// Sum of line subtotals.
    pub fn subtotal(&self) -> Decimal {
        self.lines.iter().map(Line::subtotal).sum()
    }

    /// Sum of line tax amounts.
    pub fn total_tax(&self) -> Decimal {
        self.lines.iter().map(Line::tax_amount).sum()
    }

    /// `subtotal + total_tax`.
    pub fn grand_total(&self) -> Decimal {
        self.subtotal() + self.total_tax()
    }

    /// The totals this invoice claims: declared on the document if present,
    /// otherwise derived from the lines.
    pub fn stated_totals(&self) -> DeclaredTotals {
        self.declared_totals.unwrap_or_else(|| DeclaredTotals {
            subtotal: self.subtotal(),
            total_tax: self.total_tax(),
            grand_total: self.grand_total(),
        })
    }
}

/// Anything that can be attributed to one invoice in audit logs.
pub trait InvoiceIdentity {
    fn invoice_number(&self) -> &str;
}

impl InvoiceIdentity for Invoice {
    fn invoice_number(&self) -> &str {
        &self.invoice_number
    }
}

/// Render a timestamp as ISO 8601 without offset; sub-second digits
/// (microseconds) appear only when non-zero. Anything finer than a
/// microsecond is truncated.
pub fn iso_timestamp(ts: &NaiveDateTime) -> String {
    use chrono::Timelike;
    if ts.nanosecond() / 1_000 == 0 {
        ts.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        ts.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn line(qty: Decimal, price: Decimal, rate: Decimal, discount: Decimal) -> Line {
        Line {
            id: "1".into(),
            description: "Item".into(),
            quantity: qty,
            unit_price: price,
            tax_percent: rate,
            discount,
        }
    }

    #[test]
    fn line_amounts() {
        let l = line(dec!(2), dec!(3000.00), dec!(15), dec!(0));
        assert_eq!(l.subtotal(), dec!(6000.00));
        assert_eq!(l.tax_amount(), dec!(900.00));
        assert_eq!(l.total(), dec!(6900.00));
    }

    #[test]
    fn discount_reduces_base() {
        let l = line(dec!(1), dec!(100), dec!(15), dec!(10));
        assert_eq!(l.subtotal(), dec!(90));
        assert_eq!(l.tax_amount(), dec!(13.5));
    }

    #[test]
    fn type_code_roundtrip() {
        for code in [388, 381, 383] {
            assert_eq!(InvoiceTypeCode::from_code(code).unwrap().code(), code);
        }
        assert!(InvoiceTypeCode::from_code(380).is_none());
    }

    #[test]
    fn iso_timestamp_drops_zero_fraction() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        assert_eq!(iso_timestamp(&ts), "2024-01-15T10:30:00");

        let ts = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_micro_opt(10, 30, 0, 250)
            .unwrap();
        assert_eq!(iso_timestamp(&ts), "2024-01-15T10:30:00.000250");
    }
}
