use quick_xml::Reader;
use quick_xml::events::Event;

use super::{ParseError, parse_decimal, parse_timestamp};
use crate::core::{
    AddressBuilder, DeclaredTotals, Invoice, InvoiceBuilder, InvoiceTypeCode, Line, LineBuilder,
    Party, PartyBuilder,
};

/// Parse a UBL 2.1 invoice (ZATCA profile) into an [`Invoice`].
///
/// Elements are matched by local name, so any namespace prefix works. The
/// previous-invoice hash and QR payload are read from the
/// `AdditionalDocumentReference` entries with ID `PIH` and `QR`.
pub fn parse_ubl(xml: &str) -> Result<Invoice, ParseError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut doc = ParsedInvoice::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "InvoiceLine" | "CreditNoteLine" | "DebitNoteLine" => {
                        doc.current_line = Some(ParsedLine::default());
                    }
                    "AdditionalDocumentReference" => {
                        doc.current_ref = Some(ParsedDocumentRef::default());
                    }
                    _ => {}
                }
                path.push(name);
            }
            Ok(Event::Text(ref e)) => {
                let text = e
                    .unescape()
                    .map_err(|e| ParseError::Xml(e.to_string()))?
                    .into_owned();
                if !text.is_empty() {
                    doc.handle_text(&path, &text);
                }
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(&e.into_inner()).trim().to_string();
                if !text.is_empty() {
                    doc.handle_text(&path, &text);
                }
            }
            Ok(Event::End(_)) => {
                let ended = path.pop().unwrap_or_default();
                match ended.as_str() {
                    "InvoiceLine" | "CreditNoteLine" | "DebitNoteLine" => {
                        if let Some(line) = doc.current_line.take() {
                            doc.lines.push(line);
                        }
                    }
                    "AdditionalDocumentReference" => {
                        if let Some(r) = doc.current_ref.take() {
                            doc.commit_reference(r);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ParseError::Xml(e.to_string())),
            _ => {}
        }
    }

    doc.into_invoice()
}

#[derive(Default)]
struct ParsedInvoice {
    number: Option<String>,
    issue_date: Option<String>,
    issue_time: Option<String>,
    type_code: Option<String>,
    seller: ParsedParty,
    buyer: ParsedParty,
    lines: Vec<ParsedLine>,
    current_line: Option<ParsedLine>,
    current_ref: Option<ParsedDocumentRef>,
    previous_hash: Option<String>,
    qr_code: Option<String>,
    line_extension: Option<String>,
    tax_amount: Option<String>,
    tax_inclusive: Option<String>,
}

#[derive(Default)]
struct ParsedParty {
    seen: bool,
    vat_number: Option<String>,
    name: Option<String>,
    street: Option<String>,
    building_number: Option<String>,
    additional_number: Option<String>,
    city: Option<String>,
    postal_code: Option<String>,
    country_code: Option<String>,
}

#[derive(Default)]
struct ParsedLine {
    id: Option<String>,
    name: Option<String>,
    quantity: Option<String>,
    price: Option<String>,
    classified_percent: Option<String>,
    subtotal_percent: Option<String>,
}

#[derive(Default)]
struct ParsedDocumentRef {
    id: Option<String>,
    content: Option<String>,
}

fn is_ubl_root(name: &str) -> bool {
    matches!(name, "Invoice" | "CreditNote" | "DebitNote")
}

impl ParsedInvoice {
    fn handle_text(&mut self, path: &[String], text: &str) {
        let leaf = path.last().map(String::as_str).unwrap_or("");
        let parent = if path.len() >= 2 {
            path[path.len() - 2].as_str()
        } else {
            ""
        };

        let in_seller = path.iter().any(|p| p == "AccountingSupplierParty");
        let in_buyer = path.iter().any(|p| p == "AccountingCustomerParty");

        if let Some(line) = self.current_line.as_mut() {
            line.handle_text(path, leaf, parent, text);
            return;
        }
        if let Some(r) = self.current_ref.as_mut() {
            match leaf {
                "ID" if parent == "AdditionalDocumentReference" => r.id = Some(text.to_string()),
                "EmbeddedDocumentBinaryObject" => r.content = Some(text.to_string()),
                _ => {}
            }
            return;
        }
        if in_seller {
            self.seller.handle_text(leaf, parent, text);
            return;
        }
        if in_buyer {
            self.buyer.handle_text(leaf, parent, text);
            return;
        }

        match leaf {
            "ID" if is_ubl_root(parent) => self.number = Some(text.to_string()),
            "IssueDate" if is_ubl_root(parent) => self.issue_date = Some(text.to_string()),
            "IssueTime" if is_ubl_root(parent) => self.issue_time = Some(text.to_string()),
            "InvoiceTypeCode" | "CreditNoteTypeCode" => self.type_code = Some(text.to_string()),
            "LineExtensionAmount" if parent == "LegalMonetaryTotal" => {
                self.line_extension = Some(text.to_string())
            }
            "TaxInclusiveAmount" if parent == "LegalMonetaryTotal" => {
                self.tax_inclusive = Some(text.to_string())
            }
            // ZATCA repeats TaxTotal in the accounting currency; the first wins.
            "TaxAmount" if parent == "TaxTotal" && self.tax_amount.is_none() => {
                self.tax_amount = Some(text.to_string())
            }
            _ => {}
        }
    }

    fn commit_reference(&mut self, r: ParsedDocumentRef) {
        let (Some(id), Some(content)) = (r.id, r.content) else {
            return;
        };
        match id.trim() {
            "PIH" => self.previous_hash = Some(content),
            "QR" => self.qr_code = Some(content),
            _ => {}
        }
    }

    fn into_invoice(self) -> Result<Invoice, ParseError> {
        let number = self.number.ok_or(ParseError::MissingField("invoice_number"))?;
        let date = self
            .issue_date
            .ok_or(ParseError::MissingField("issue_date"))?;
        let issue_date = match self.issue_time.as_deref() {
            Some(time) => parse_timestamp(
                "issue_date",
                &format!("{}T{}", date.trim(), time.trim().trim_end_matches('Z')),
            )?,
            None => parse_timestamp("issue_date", &date)?,
        };

        let invoice_type = match self.type_code.as_deref() {
            None => InvoiceTypeCode::Standard,
            Some(code) => code
                .trim()
                .parse()
                .ok()
                .and_then(InvoiceTypeCode::from_code)
                .ok_or_else(|| ParseError::InvalidValue {
                    field: "invoice_type",
                    value: code.to_string(),
                })?,
        };

        let seller = self.seller.into_party("seller")?;
        let buyer = self.buyer.into_party("buyer")?;
        let lines = self
            .lines
            .into_iter()
            .map(ParsedLine::into_line)
            .collect::<Result<Vec<_>, _>>()?;

        let mut builder = InvoiceBuilder::new(number, issue_date)
            .invoice_type(invoice_type)
            .seller(seller)
            .buyer(buyer)
            .lines(lines);
        if let Some(hash) = self.previous_hash {
            builder = builder.previous_invoice_hash(hash);
        }
        if let Some(qr) = self.qr_code {
            builder = builder.qr_code(qr);
        }
        if let (Some(subtotal), Some(tax), Some(total)) =
            (self.line_extension, self.tax_amount, self.tax_inclusive)
        {
            builder = builder.declared_totals(DeclaredTotals {
                subtotal: parse_decimal("LineExtensionAmount", &subtotal)?,
                total_tax: parse_decimal("TaxAmount", &tax)?,
                grand_total: parse_decimal("TaxInclusiveAmount", &total)?,
            });
        }
        Ok(builder.build()?)
    }
}

impl ParsedParty {
    fn handle_text(&mut self, leaf: &str, parent: &str, text: &str) {
        self.seen = true;
        let value = Some(text.to_string());
        match leaf {
            // The tax scheme registration is the VAT number; a legal entity
            // CompanyID only fills in when none was seen.
            "CompanyID" if parent == "PartyTaxScheme" => self.vat_number = value,
            "CompanyID" if self.vat_number.is_none() => self.vat_number = value,
            "RegistrationName" => self.name = value,
            "StreetName" => self.street = value,
            "BuildingNumber" => self.building_number = value,
            "PlotIdentification" => self.additional_number = value,
            "CityName" => self.city = value,
            "PostalZone" => self.postal_code = value,
            "IdentificationCode" if parent == "Country" => self.country_code = value,
            _ => {}
        }
    }

    fn into_party(self, role: &'static str) -> Result<Party, ParseError> {
        if !self.seen {
            return Err(ParseError::MissingField(role));
        }
        let mut address = AddressBuilder::new(
            self.street.unwrap_or_default(),
            self.city.unwrap_or_default(),
            self.postal_code.unwrap_or_default(),
            self.country_code.unwrap_or_else(|| "SA".to_string()),
        );
        if let Some(n) = self.building_number {
            address = address.building_number(n);
        }
        if let Some(n) = self.additional_number {
            address = address.additional_number(n);
        }
        Ok(PartyBuilder::new(
            self.vat_number.unwrap_or_default(),
            self.name.unwrap_or_default(),
            address.build()?,
        )
        .build()?)
    }
}

impl ParsedLine {
    fn handle_text(&mut self, path: &[String], leaf: &str, parent: &str, text: &str) {
        let value = Some(text.to_string());
        match leaf {
            "ID" if matches!(parent, "InvoiceLine" | "CreditNoteLine" | "DebitNoteLine") => {
                self.id = value
            }
            "Name" if parent == "Item" => self.name = value,
            "InvoicedQuantity" | "CreditedQuantity" | "DebitedQuantity" => self.quantity = value,
            "PriceAmount" if parent == "Price" => self.price = value,
            "Percent" if parent == "ClassifiedTaxCategory" => self.classified_percent = value,
            "Percent" if path.iter().any(|p| p == "TaxSubtotal") => {
                self.subtotal_percent = value
            }
            _ => {}
        }
    }

    fn into_line(self) -> Result<Line, ParseError> {
        let quantity = self
            .quantity
            .ok_or(ParseError::MissingField("InvoicedQuantity"))?;
        let price = self.price.ok_or(ParseError::MissingField("PriceAmount"))?;
        let mut builder = LineBuilder::new(
            self.id.unwrap_or_default(),
            self.name.unwrap_or_default(),
            parse_decimal("InvoicedQuantity", &quantity)?,
            parse_decimal("PriceAmount", &price)?,
        );
        if let Some(percent) = self.classified_percent.or(self.subtotal_percent) {
            builder = builder.tax_percent(parse_decimal("Percent", &percent)?);
        }
        Ok(builder.build()?)
    }
}
