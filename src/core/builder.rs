use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::error::ComplianceError;
use super::types::*;

/// Upper bound on quantity, unit price and discount of a line.
///
/// Together with [`MAX_LINES`] this keeps every derived amount and total
/// inside the range of [`Decimal`], so totals never overflow.
pub const MAX_LINE_AMOUNT: Decimal = dec!(1000000000000);

/// Upper bound on the number of lines on one invoice.
pub const MAX_LINES: usize = 10_000;

/// Builder for constructing invoices that satisfy the model invariants.
///
/// ```
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
/// use zatca_compliance::core::*;
///
/// let address = AddressBuilder::new("King Fahd Road", "Riyadh", "12345", "sa").build().unwrap();
/// let party = PartyBuilder::new("310122393500003", "ABC Trading", address).build().unwrap();
/// let issued = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap().and_hms_opt(9, 0, 0).unwrap();
///
/// let invoice = InvoiceBuilder::new("INV-2024-001", issued)
///     .seller(party.clone())
///     .buyer(party)
///     .add_line(LineBuilder::new("1", "Laptop", dec!(2), dec!(3000.00)).build().unwrap())
///     .build()
///     .unwrap();
///
/// assert_eq!(invoice.grand_total(), dec!(6900.00));
/// assert_eq!(invoice.seller.address.country_code, "SA");
/// ```
pub struct InvoiceBuilder {
    invoice_number: String,
    issue_date: NaiveDateTime,
    invoice_type: InvoiceTypeCode,
    seller: Option<Party>,
    buyer: Option<Party>,
    lines: Vec<Line>,
    previous_invoice_hash: Option<String>,
    qr_code: Option<String>,
    cryptographic_stamp: Option<String>,
    declared_totals: Option<DeclaredTotals>,
}

impl InvoiceBuilder {
    pub fn new(invoice_number: impl Into<String>, issue_date: NaiveDateTime) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            issue_date,
            invoice_type: InvoiceTypeCode::Standard,
            seller: None,
            buyer: None,
            lines: Vec::new(),
            previous_invoice_hash: None,
            qr_code: None,
            cryptographic_stamp: None,
            declared_totals: None,
        }
    }

    pub fn invoice_type(mut self, invoice_type: InvoiceTypeCode) -> Self {
        self.invoice_type = invoice_type;
        self
    }

    pub fn seller(mut self, party: Party) -> Self {
        self.seller = Some(party);
        self
    }

    pub fn buyer(mut self, party: Party) -> Self {
        self.buyer = Some(party);
        self
    }

    pub fn add_line(mut self, line: Line) -> Self {
        self.lines.push(line);
        self
    }

    pub fn lines(mut self, lines: impl IntoIterator<Item = Line>) -> Self {
        self.lines.extend(lines);
        self
    }

    pub fn previous_invoice_hash(mut self, hash: impl Into<String>) -> Self {
        self.previous_invoice_hash = Some(hash.into());
        self
    }

    pub fn qr_code(mut self, payload: impl Into<String>) -> Self {
        self.qr_code = Some(payload.into());
        self
    }

    pub fn cryptographic_stamp(mut self, stamp: impl Into<String>) -> Self {
        self.cryptographic_stamp = Some(stamp.into());
        self
    }

    pub fn declared_totals(mut self, totals: DeclaredTotals) -> Self {
        self.declared_totals = Some(totals);
        self
    }

    /// Build the invoice, rejecting values that break the model invariants.
    ///
    /// Compliance rules are not evaluated here; run a
    /// [`Validator`](super::Validator) on the result for that.
    pub fn build(self) -> Result<Invoice, ComplianceError> {
        if self.invoice_number.trim().is_empty() {
            return Err(ComplianceError::Builder(
                "invoice number must not be empty".into(),
            ));
        }

        let seller = self
            .seller
            .ok_or_else(|| ComplianceError::Builder("seller is required".into()))?;
        let buyer = self
            .buyer
            .ok_or_else(|| ComplianceError::Builder("buyer is required".into()))?;

        if self.lines.is_empty() {
            return Err(ComplianceError::Builder(
                "at least one line item is required".into(),
            ));
        }
        if self.lines.len() > MAX_LINES {
            return Err(ComplianceError::Builder(format!(
                "invoice cannot have more than {MAX_LINES} line items"
            )));
        }

        Ok(Invoice {
            invoice_number: self.invoice_number,
            issue_date: self.issue_date,
            invoice_type: self.invoice_type,
            seller,
            buyer,
            lines: self.lines,
            previous_invoice_hash: self.previous_invoice_hash,
            qr_code: self.qr_code,
            cryptographic_stamp: self.cryptographic_stamp,
            declared_totals: self.declared_totals,
        })
    }
}

/// Builder for Party (seller/buyer).
pub struct PartyBuilder {
    vat_number: String,
    name: String,
    address: Address,
}

impl PartyBuilder {
    pub fn new(vat_number: impl Into<String>, name: impl Into<String>, address: Address) -> Self {
        Self {
            vat_number: vat_number.into(),
            name: name.into(),
            address,
        }
    }

    /// Fails unless the VAT number is exactly 15 ASCII digits. Whether it
    /// also satisfies the ZATCA start/end digit rule is a compliance
    /// question answered by the validator, not here.
    pub fn build(self) -> Result<Party, ComplianceError> {
        let vat_number = self.vat_number.trim().to_string();
        if vat_number.len() != 15 {
            return Err(ComplianceError::Builder(format!(
                "VAT number must be 15 characters, got {}",
                vat_number.len()
            )));
        }
        if !vat_number.chars().all(|c| c.is_ascii_digit()) {
            return Err(ComplianceError::Builder(
                "VAT number must be numeric".into(),
            ));
        }
        Ok(Party {
            vat_number,
            name: self.name,
            address: self.address,
        })
    }
}

/// Builder for Address.
pub struct AddressBuilder {
    street: String,
    building_number: Option<String>,
    additional_number: Option<String>,
    city: String,
    postal_code: String,
    country_code: String,
}

impl AddressBuilder {
    pub fn new(
        street: impl Into<String>,
        city: impl Into<String>,
        postal_code: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            street: street.into(),
            building_number: None,
            additional_number: None,
            city: city.into(),
            postal_code: postal_code.into(),
            country_code: country_code.into(),
        }
    }

    pub fn building_number(mut self, number: impl Into<String>) -> Self {
        self.building_number = Some(number.into());
        self
    }

    pub fn additional_number(mut self, number: impl Into<String>) -> Self {
        self.additional_number = Some(number.into());
        self
    }

    /// Normalizes the country code to upper case; fails unless it is
    /// exactly 2 characters.
    pub fn build(self) -> Result<Address, ComplianceError> {
        if self.country_code.chars().count() != 2 {
            return Err(ComplianceError::Builder(format!(
                "country code must be 2 characters, got '{}'",
                self.country_code
            )));
        }
        Ok(Address {
            street: self.street,
            building_number: self.building_number,
            additional_number: self.additional_number,
            city: self.city,
            postal_code: self.postal_code,
            country_code: self.country_code.to_uppercase(),
        })
    }
}

/// Builder for Line. Tax percent defaults to the 15% standard rate.
pub struct LineBuilder {
    id: String,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    tax_percent: Decimal,
    discount: Decimal,
}

impl LineBuilder {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            quantity,
            unit_price,
            tax_percent: Decimal::new(15, 0),
            discount: Decimal::ZERO,
        }
    }

    pub fn tax_percent(mut self, rate: Decimal) -> Self {
        self.tax_percent = rate;
        self
    }

    pub fn discount(mut self, discount: Decimal) -> Self {
        self.discount = discount;
        self
    }

    pub fn build(self) -> Result<Line, ComplianceError> {
        let prefix = format!("line {}", self.id);
        if self.quantity <= Decimal::ZERO {
            return Err(ComplianceError::Builder(format!(
                "{prefix}: quantity must be greater than zero"
            )));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(ComplianceError::Builder(format!(
                "{prefix}: unit price must not be negative"
            )));
        }
        if self.tax_percent < Decimal::ZERO || self.tax_percent > Decimal::ONE_HUNDRED {
            return Err(ComplianceError::Builder(format!(
                "{prefix}: tax percent must be between 0 and 100"
            )));
        }
        if self.discount < Decimal::ZERO {
            return Err(ComplianceError::Builder(format!(
                "{prefix}: discount must not be negative"
            )));
        }
        if [self.quantity, self.unit_price, self.discount]
            .iter()
            .any(|v| *v > MAX_LINE_AMOUNT)
        {
            return Err(ComplianceError::Builder(format!(
                "{prefix}: amounts must not exceed {MAX_LINE_AMOUNT}"
            )));
        }
        Ok(Line {
            id: self.id,
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_percent: self.tax_percent,
            discount: self.discount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn address() -> Address {
        AddressBuilder::new("King Fahd Road", "Riyadh", "12345", "SA")
            .build()
            .unwrap()
    }

    fn party() -> Party {
        PartyBuilder::new("310122393500003", "ABC Trading", address())
            .build()
            .unwrap()
    }

    fn issued() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn line() -> Line {
        LineBuilder::new("1", "Laptop", dec!(2), dec!(3000)).build().unwrap()
    }

    #[test]
    fn country_code_is_normalized() {
        let a = AddressBuilder::new("Street", "Jeddah", "21577", "sa")
            .building_number("1234")
            .build()
            .unwrap();
        assert_eq!(a.country_code, "SA");
        assert_eq!(a.building_number.as_deref(), Some("1234"));
    }

    #[test]
    fn country_code_length_enforced() {
        assert!(AddressBuilder::new("S", "C", "1", "SAU").build().is_err());
        assert!(AddressBuilder::new("S", "C", "1", "").build().is_err());
    }

    #[test]
    fn vat_number_shape_enforced() {
        assert!(PartyBuilder::new("31012239350000", "X", address()).build().is_err());
        assert!(PartyBuilder::new("31012239350000A", "X", address()).build().is_err());
        // Shape is fine; the 3...3 rule is checked by the validator.
        assert!(PartyBuilder::new("210122393500001", "X", address()).build().is_ok());
    }

    #[test]
    fn line_bounds_enforced() {
        assert!(LineBuilder::new("1", "x", dec!(0), dec!(1)).build().is_err());
        assert!(LineBuilder::new("1", "x", dec!(1), dec!(-1)).build().is_err());
        assert!(
            LineBuilder::new("1", "x", dec!(1), dec!(1))
                .tax_percent(dec!(101))
                .build()
                .is_err()
        );
        assert!(
            LineBuilder::new("1", "x", dec!(1), dec!(1))
                .discount(dec!(-0.01))
                .build()
                .is_err()
        );
        assert!(LineBuilder::new("1", "x", dec!(1), dec!(0)).build().is_ok());
    }

    #[test]
    fn oversized_amounts_rejected() {
        let huge = MAX_LINE_AMOUNT + dec!(0.01);
        assert!(LineBuilder::new("1", "x", huge, dec!(1)).build().is_err());
        assert!(LineBuilder::new("1", "x", dec!(1), huge).build().is_err());
        assert!(
            LineBuilder::new("1", "x", dec!(1), dec!(1))
                .discount(huge)
                .build()
                .is_err()
        );
        assert!(
            LineBuilder::new("1", "x", MAX_LINE_AMOUNT, MAX_LINE_AMOUNT)
                .build()
                .is_ok()
        );
    }

    #[test]
    fn line_count_capped() {
        let err = InvoiceBuilder::new("INV-1", issued())
            .seller(party())
            .buyer(party())
            .lines(std::iter::repeat_n(line(), MAX_LINES + 1))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("line items"));
    }

    #[test]
    fn long_invoice_numbers_accepted() {
        let number = "N".repeat(500);
        let inv = InvoiceBuilder::new(number.clone(), issued())
            .seller(party())
            .buyer(party())
            .add_line(line())
            .build()
            .unwrap();
        assert_eq!(inv.invoice_number, number);
    }

    #[test]
    fn invoice_requires_parties_and_lines() {
        let err = InvoiceBuilder::new("INV-1", issued())
            .buyer(party())
            .add_line(line())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("seller"));

        let err = InvoiceBuilder::new("INV-1", issued())
            .seller(party())
            .buyer(party())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("line"));

        let err = InvoiceBuilder::new("  ", issued())
            .seller(party())
            .buyer(party())
            .add_line(line())
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("invoice number"));
    }

    #[test]
    fn invoice_defaults_to_standard_type() {
        let inv = InvoiceBuilder::new("INV-1", issued())
            .seller(party())
            .buyer(party())
            .add_line(line())
            .build()
            .unwrap();
        assert_eq!(inv.invoice_type, InvoiceTypeCode::Standard);
        assert!(inv.declared_totals.is_none());
    }
}
