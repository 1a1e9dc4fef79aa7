#![no_main]

use libfuzzer_sys::fuzz_target;
use zatca_compliance::core::{InvoiceValidator, Validator};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(invoice) = zatca_compliance::parse::parse_ubl(s) {
            let _ = Validator::default().validate(&invoice);
            let _ = zatca_compliance::chain::compute_hash(&invoice);
        }
    }
});
