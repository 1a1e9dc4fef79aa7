use rust_decimal::Decimal;
use serde::Deserialize;

use super::{ParseError, parse_timestamp};
use crate::core::{
    AddressBuilder, DeclaredTotals, Invoice, InvoiceBuilder, InvoiceTypeCode, LineBuilder, Party,
    PartyBuilder,
};

/// Parse a JSON invoice document.
///
/// Field names follow the domain model. Amounts may be given as JSON
/// numbers or strings; `invoice_type` as `388` or `"388"`.
pub fn parse_json(input: &str) -> Result<Invoice, ParseError> {
    let doc: InvoiceDoc = serde_json::from_str(input)?;
    doc.into_invoice()
}

#[derive(Deserialize)]
struct InvoiceDoc {
    invoice_number: String,
    issue_date: Option<String>,
    #[serde(default)]
    invoice_type: Option<TypeCode>,
    seller: Option<PartyDoc>,
    buyer: Option<PartyDoc>,
    #[serde(default)]
    lines: Vec<LineDoc>,
    previous_invoice_hash: Option<String>,
    qr_code: Option<String>,
    cryptographic_stamp: Option<String>,
    declared_totals: Option<DeclaredTotals>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TypeCode {
    Number(u16),
    Text(String),
}

#[derive(Deserialize)]
struct PartyDoc {
    vat_number: String,
    name: String,
    address: AddressDoc,
}

#[derive(Deserialize)]
struct AddressDoc {
    street: String,
    building_number: Option<String>,
    additional_number: Option<String>,
    city: String,
    postal_code: String,
    country_code: String,
}

#[derive(Deserialize)]
struct LineDoc {
    id: String,
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    tax_percent: Option<Decimal>,
    discount: Option<Decimal>,
}

impl InvoiceDoc {
    fn into_invoice(self) -> Result<Invoice, ParseError> {
        let issue_date = parse_timestamp(
            "issue_date",
            self.issue_date
                .as_deref()
                .ok_or(ParseError::MissingField("issue_date"))?,
        )?;

        let invoice_type = match self.invoice_type {
            None => InvoiceTypeCode::Standard,
            Some(code) => {
                let raw = match code {
                    TypeCode::Number(n) => n.to_string(),
                    TypeCode::Text(s) => s,
                };
                raw.trim()
                    .parse()
                    .ok()
                    .and_then(InvoiceTypeCode::from_code)
                    .ok_or(ParseError::InvalidValue {
                        field: "invoice_type",
                        value: raw,
                    })?
            }
        };

        let seller = self
            .seller
            .ok_or(ParseError::MissingField("seller"))?
            .into_party()?;
        let buyer = self
            .buyer
            .ok_or(ParseError::MissingField("buyer"))?
            .into_party()?;

        let mut lines = Vec::with_capacity(self.lines.len());
        for line in self.lines {
            let mut builder =
                LineBuilder::new(line.id, line.description, line.quantity, line.unit_price);
            if let Some(rate) = line.tax_percent {
                builder = builder.tax_percent(rate);
            }
            if let Some(discount) = line.discount {
                builder = builder.discount(discount);
            }
            lines.push(builder.build()?);
        }

        let mut builder = InvoiceBuilder::new(self.invoice_number, issue_date)
            .invoice_type(invoice_type)
            .seller(seller)
            .buyer(buyer)
            .lines(lines);
        if let Some(hash) = self.previous_invoice_hash {
            builder = builder.previous_invoice_hash(hash);
        }
        if let Some(qr) = self.qr_code {
            builder = builder.qr_code(qr);
        }
        if let Some(stamp) = self.cryptographic_stamp {
            builder = builder.cryptographic_stamp(stamp);
        }
        if let Some(totals) = self.declared_totals {
            builder = builder.declared_totals(totals);
        }
        Ok(builder.build()?)
    }
}

impl PartyDoc {
    fn into_party(self) -> Result<Party, ParseError> {
        let a = self.address;
        let mut address = AddressBuilder::new(a.street, a.city, a.postal_code, a.country_code);
        if let Some(n) = a.building_number {
            address = address.building_number(n);
        }
        if let Some(n) = a.additional_number {
            address = address.additional_number(n);
        }
        Ok(PartyBuilder::new(self.vat_number, self.name, address.build()?).build()?)
    }
}
