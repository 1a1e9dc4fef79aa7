#![no_main]

use libfuzzer_sys::fuzz_target;
use zatca_compliance::core::{InvoiceValidator, Validator};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Errors are fine, panics are bugs. Whatever parses must also validate.
        if let Ok(invoice) = zatca_compliance::parse::parse_json(s) {
            let _ = Validator::default().validate(&invoice);
        }
    }
});
