use crate::core::ValidationResult;

const HEADER: [&str; 5] = [
    "Invoice Number",
    "Compliant",
    "Violation Count",
    "Violation Codes",
    "Processing Time (ms)",
];

/// One row per result, RFC 4180 quoting, CRLF line endings.
///
/// Violation codes are joined with commas inside a single quoted field;
/// the processing time column is empty when no time was measured.
pub fn csv_report(results: &[ValidationResult]) -> String {
    let mut out = String::new();
    write_row(&mut out, HEADER.iter().copied());

    for result in results {
        let compliant = if result.is_compliant() { "Yes" } else { "No" };
        let count = result.violations().len().to_string();
        let codes = result.codes().join(",");
        let time = result
            .processing_time_ms
            .map(|ms| ms.to_string())
            .unwrap_or_default();
        write_row(
            &mut out,
            [
                result.invoice_number.as_str(),
                compliant,
                count.as_str(),
                codes.as_str(),
                time.as_str(),
            ],
        );
    }
    out
}

fn write_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        csv_field(out, field);
    }
    out.push_str("\r\n");
}

/// Quote only when the value needs it; embedded quotes are doubled.
fn csv_field(out: &mut String, value: &str) {
    if !value.contains([',', '"', '\n', '\r']) {
        out.push_str(value);
        return;
    }
    out.push('"');
    for ch in value.chars() {
        if ch == '"' {
            out.push_str("\"\"");
        } else {
            out.push(ch);
        }
    }
    out.push('"');
}
