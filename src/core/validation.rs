use chrono::{Local, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::codes::{self, rules};
use super::error::{Severity, Violation};
use super::result::ValidationResult;
use super::types::*;

/// Anything that turns one invoice into a [`ValidationResult`].
///
/// Processors are generic over this seam so an engine can be wrapped
/// (see [`Instrumented`](super::Instrumented)) or replaced in tests.
pub trait InvoiceValidator {
    fn validate(&self, invoice: &Invoice) -> ValidationResult;
}

impl<V: InvoiceValidator + ?Sized> InvoiceValidator for &V {
    fn validate(&self, invoice: &Invoice) -> ValidationResult {
        (**self).validate(invoice)
    }
}

/// Tunables of the rule engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatorConfig {
    /// Record WARNING findings as ERRORs, making them affect compliance.
    pub strict_mode: bool,
    /// Invoices older than this many days draw a `DATE_002` warning.
    pub max_age_days: i64,
    /// Absolute tolerance for total reconciliation.
    pub calculation_tolerance: Decimal,
    /// VAT rates considered usual; anything else draws `LINE_004`.
    pub allowed_tax_rates: Vec<Decimal>,
    /// QR payloads shorter than this draw `QR_002`.
    pub min_qr_length: usize,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            strict_mode: false,
            max_age_days: 730,
            calculation_tolerance: dec!(0.01),
            allowed_tax_rates: vec![dec!(0), dec!(15)],
            min_qr_length: 20,
        }
    }
}

impl ValidatorConfig {
    pub fn strict() -> Self {
        Self {
            strict_mode: true,
            ..Self::default()
        }
    }
}

/// ZATCA Phase 2 rule engine.
///
/// Stateless after configuration: [`validate`](InvoiceValidator::validate)
/// only reads the invoice and always returns a result. Checks run in a
/// fixed order so violation lists are deterministic.
#[derive(Debug, Clone, Default)]
pub struct Validator {
    config: ValidatorConfig,
    reference_time: Option<NaiveDateTime>,
}

impl Validator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self {
            config,
            reference_time: None,
        }
    }

    /// Evaluate date rules against a fixed "now" instead of the local clock.
    pub fn with_reference_time(mut self, now: NaiveDateTime) -> Self {
        self.reference_time = Some(now);
        self
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    fn now(&self) -> NaiveDateTime {
        self.reference_time
            .unwrap_or_else(|| Local::now().naive_local())
    }
}

impl InvoiceValidator for Validator {
    fn validate(&self, invoice: &Invoice) -> ValidationResult {
        let mut findings = Findings::new(invoice, self.config.strict_mode);

        check_required_fields(invoice, &mut findings);
        check_vat_numbers(invoice, &mut findings);
        check_dates(invoice, self.now(), self.config.max_age_days, &mut findings);
        check_line_items(invoice, &self.config.allowed_tax_rates, &mut findings);
        check_calculations(invoice, self.config.calculation_tolerance, &mut findings);
        check_qr_code(invoice, self.config.min_qr_length, &mut findings);
        check_previous_hash(invoice, &mut findings);

        findings.result
    }
}

/// Collects violations for one invoice, applying strict-mode elevation.
struct Findings {
    result: ValidationResult,
    strict: bool,
}

impl Findings {
    fn new(invoice: &Invoice, strict: bool) -> Self {
        Self {
            result: ValidationResult::new(invoice.invoice_number.clone()),
            strict,
        }
    }

    fn error(&mut self, code: &str, field: impl Into<String>, message: impl Into<String>, rule: &str) {
        self.result
            .add_violation(Violation::error(code, field, message, rule));
    }

    fn warning(&mut self, code: &str, field: impl Into<String>, message: impl Into<String>, rule: &str) {
        let severity = if self.strict {
            Severity::Error
        } else {
            Severity::Warning
        };
        self.result
            .add_violation(Violation::new(code, severity, field, message, rule));
    }
}

/// True iff `vat` is 15 ASCII digits starting and ending with `3`.
pub fn is_valid_vat_number(vat: &str) -> bool {
    let bytes = vat.as_bytes();
    bytes.len() == 15
        && bytes.iter().all(u8::is_ascii_digit)
        && bytes[0] == b'3'
        && bytes[14] == b'3'
}

/// True iff `hash` is a non-empty string of hexadecimal digits.
pub fn is_hex_digest(hash: &str) -> bool {
    !hash.is_empty() && hash.chars().all(|c| c.is_ascii_hexdigit())
}

fn check_required_fields(invoice: &Invoice, findings: &mut Findings) {
    // Issue date, seller and buyer are guaranteed by the type system; an
    // empty line list is reported by the line item check.
    if invoice.invoice_number.trim().is_empty() {
        findings.error(
            codes::REQ_MISSING_FIELD,
            "invoice_number",
            "Required field invoice_number is missing",
            rules::REQUIRED_FIELDS,
        );
    }
}

fn check_vat_numbers(invoice: &Invoice, findings: &mut Findings) {
    if !is_valid_vat_number(&invoice.seller.vat_number) {
        findings.error(
            codes::VAT_SELLER_FORMAT,
            "seller.vat_number",
            format!(
                "Invalid seller VAT number format: {}",
                invoice.seller.vat_number
            ),
            rules::SELLER_VAT,
        );
    }

    if !is_valid_vat_number(&invoice.buyer.vat_number) {
        findings.error(
            codes::VAT_BUYER_FORMAT,
            "buyer.vat_number",
            format!(
                "Invalid buyer VAT number format: {}",
                invoice.buyer.vat_number
            ),
            rules::BUYER_VAT,
        );
    }
}

fn check_dates(invoice: &Invoice, now: NaiveDateTime, max_age_days: i64, findings: &mut Findings) {
    if invoice.issue_date > now {
        findings.error(
            codes::DATE_IN_FUTURE,
            "issue_date",
            "Invoice date cannot be in the future",
            rules::FUTURE_DATE,
        );
    }

    let age = (now - invoice.issue_date).num_days();
    if age > max_age_days {
        findings.warning(
            codes::DATE_TOO_OLD,
            "issue_date",
            format!("Invoice is too old: {age} days"),
            rules::INVOICE_AGE,
        );
    }
}

fn check_line_items(invoice: &Invoice, allowed_rates: &[Decimal], findings: &mut Findings) {
    if invoice.lines.is_empty() {
        findings.error(
            codes::LINE_MISSING,
            "lines",
            "Invoice must have at least one line item",
            rules::HAS_LINES,
        );
        return;
    }

    for (idx, line) in invoice.lines.iter().enumerate() {
        if line.quantity <= Decimal::ZERO {
            findings.error(
                codes::LINE_QUANTITY,
                format!("lines[{idx}].quantity"),
                format!("Line {}: Quantity must be positive", line.id),
                rules::POSITIVE_QUANTITY,
            );
        }

        if line.unit_price < Decimal::ZERO {
            findings.error(
                codes::LINE_UNIT_PRICE,
                format!("lines[{idx}].unit_price"),
                format!("Line {}: Unit price cannot be negative", line.id),
                rules::NON_NEGATIVE_PRICE,
            );
        }

        if !allowed_rates.contains(&line.tax_percent) {
            findings.warning(
                codes::LINE_UNUSUAL_RATE,
                format!("lines[{idx}].tax_percent"),
                format!("Line {}: Unusual VAT rate {}%", line.id, line.tax_percent),
                rules::VAT_RATE,
            );
        }
    }
}

fn check_calculations(invoice: &Invoice, tolerance: Decimal, findings: &mut Findings) {
    // Recompute from the lines independently of the invoice accessors.
    let mut calc_subtotal = Decimal::ZERO;
    let mut calc_tax = Decimal::ZERO;
    for line in &invoice.lines {
        let base = line.quantity * line.unit_price - line.discount;
        calc_subtotal += base;
        calc_tax += base * line.tax_percent / Decimal::ONE_HUNDRED;
    }
    let calc_total = calc_subtotal + calc_tax;

    let stated = invoice.stated_totals();

    if exceeds_tolerance(stated.subtotal, calc_subtotal, tolerance) {
        findings.error(
            codes::CALC_SUBTOTAL,
            "subtotal",
            format!(
                "Subtotal mismatch: invoice={}, calculated={calc_subtotal}",
                stated.subtotal
            ),
            rules::SUBTOTAL,
        );
    }

    if exceeds_tolerance(stated.total_tax, calc_tax, tolerance) {
        findings.error(
            codes::CALC_TAX,
            "total_tax",
            format!(
                "Tax total mismatch: invoice={}, calculated={calc_tax}",
                stated.total_tax
            ),
            rules::TAX_TOTAL,
        );
    }

    if exceeds_tolerance(stated.grand_total, calc_total, tolerance) {
        findings.error(
            codes::CALC_GRAND_TOTAL,
            "grand_total",
            format!(
                "Grand total mismatch: invoice={}, calculated={calc_total}",
                stated.grand_total
            ),
            rules::GRAND_TOTAL,
        );
    }
}

/// Declared totals come straight from the document and may sit anywhere in
/// the `Decimal` range; a difference that does not fit is a mismatch.
fn exceeds_tolerance(stated: Decimal, calculated: Decimal, tolerance: Decimal) -> bool {
    stated
        .checked_sub(calculated)
        .is_none_or(|diff| diff.abs() > tolerance)
}

fn check_qr_code(invoice: &Invoice, min_length: usize, findings: &mut Findings) {
    let Some(qr) = invoice.qr_code.as_deref().filter(|q| !q.is_empty()) else {
        findings.error(
            codes::QR_MISSING,
            "qr_code",
            "QR code is missing",
            rules::QR_PRESENT,
        );
        return;
    };

    if qr.chars().count() < min_length {
        findings.warning(
            codes::QR_TOO_SHORT,
            "qr_code",
            "QR code appears invalid (too short)",
            rules::QR_FORMAT,
        );
    }
}

fn check_previous_hash(invoice: &Invoice, findings: &mut Findings) {
    let pih = invoice
        .previous_invoice_hash
        .as_deref()
        .filter(|h| !h.is_empty());

    match pih {
        None if invoice.invoice_type == InvoiceTypeCode::Standard => {
            findings.error(
                codes::HASH_MISSING,
                "previous_invoice_hash",
                "Previous invoice hash (PIH) is required",
                rules::PIH_PRESENT,
            );
        }
        Some(hash) if !is_hex_digest(hash) => {
            findings.error(
                codes::HASH_FORMAT,
                "previous_invoice_hash",
                "Previous invoice hash format is invalid",
                rules::PIH_FORMAT,
            );
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AddressBuilder, InvoiceBuilder, LineBuilder, PartyBuilder};
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn party(vat: &str) -> Party {
        PartyBuilder::new(
            vat,
            "ABC Trading Company",
            AddressBuilder::new("King Fahd Road", "Riyadh", "12345", "SA")
                .building_number("1234")
                .build()
                .unwrap(),
        )
        .build()
        .unwrap()
    }

    fn invoice() -> Invoice {
        InvoiceBuilder::new("INV-2024-001", now() - Duration::hours(1))
            .seller(party("310122393500003"))
            .buyer(party("300000000000003"))
            .add_line(
                LineBuilder::new("1", "Laptop Computer", dec!(2), dec!(3000.00))
                    .build()
                    .unwrap(),
            )
            .qr_code("TlRBQj1BQkMgVHJhZGluZyBDb21wYW55")
            .previous_invoice_hash("abc123def456")
            .build()
            .unwrap()
    }

    fn validator() -> Validator {
        Validator::default().with_reference_time(now())
    }

    #[test]
    fn valid_invoice_has_no_findings() {
        let result = validator().validate(&invoice());
        assert!(result.is_compliant(), "{:?}", result.violations());
        assert!(result.violations().is_empty());
    }

    #[test]
    fn vat_pattern() {
        assert!(is_valid_vat_number("310122393500003"));
        assert!(!is_valid_vat_number("210122393500003"));
        assert!(!is_valid_vat_number("310122393500001"));
        assert!(!is_valid_vat_number("3101223935003"));
        assert!(!is_valid_vat_number("31012239350000３"));
    }

    #[test]
    fn hex_pattern() {
        assert!(is_hex_digest("abcDEF0123"));
        assert!(!is_hex_digest("xyz"));
        assert!(!is_hex_digest(""));
    }

    #[test]
    fn old_invoice_warns_but_stays_compliant() {
        let mut inv = invoice();
        inv.issue_date = now() - Duration::days(731);
        let result = validator().validate(&inv);
        assert!(result.is_compliant());
        assert_eq!(result.codes(), vec![codes::DATE_TOO_OLD]);
        assert_eq!(result.violations()[0].severity, Severity::Warning);
    }

    #[test]
    fn exactly_max_age_is_not_old() {
        let mut inv = invoice();
        inv.issue_date = now() - Duration::days(730);
        assert!(validator().validate(&inv).violations().is_empty());
    }

    #[test]
    fn strict_mode_elevates_warnings() {
        let mut inv = invoice();
        inv.issue_date = now() - Duration::days(800);
        let result = Validator::new(ValidatorConfig::strict())
            .with_reference_time(now())
            .validate(&inv);
        assert!(!result.is_compliant());
        assert_eq!(result.violations()[0].severity, Severity::Error);
    }

    #[test]
    fn credit_note_does_not_need_pih() {
        let mut inv = invoice();
        inv.invoice_type = InvoiceTypeCode::CreditNote;
        inv.previous_invoice_hash = None;
        assert!(validator().validate(&inv).is_compliant());
    }

    #[test]
    fn empty_pih_counts_as_missing() {
        let mut inv = invoice();
        inv.previous_invoice_hash = Some(String::new());
        let result = validator().validate(&inv);
        assert_eq!(result.codes(), vec![codes::HASH_MISSING]);
    }

    #[test]
    fn extreme_declared_totals_are_a_mismatch() {
        let mut inv = invoice();
        inv.declared_totals = Some(DeclaredTotals {
            subtotal: Decimal::MAX,
            total_tax: Decimal::MIN,
            grand_total: Decimal::MAX,
        });
        inv.lines[0].discount = dec!(7000);
        let result = validator().validate(&inv);
        assert_eq!(
            result.codes(),
            vec![
                codes::CALC_SUBTOTAL,
                codes::CALC_TAX,
                codes::CALC_GRAND_TOTAL
            ]
        );
    }

    #[test]
    fn empty_lines_short_circuit() {
        let mut inv = invoice();
        inv.lines.clear();
        let result = validator().validate(&inv);
        assert!(result.has_code(codes::LINE_MISSING));
        assert!(!result.has_code(codes::REQ_MISSING_FIELD));
        assert!(!result.has_code(codes::LINE_QUANTITY));
    }
}
