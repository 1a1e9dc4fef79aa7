#![cfg(feature = "processing")]

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, Local, NaiveDateTime};
use rust_decimal_macros::dec;
use serde_json::json;
use zatca_compliance::core::codes;
use zatca_compliance::core::*;
use zatca_compliance::processing::*;

fn issued() -> NaiveDateTime {
    Local::now().naive_local() - Duration::hours(1)
}

fn party(vat: &str) -> Party {
    PartyBuilder::new(
        vat,
        "ABC Trading",
        AddressBuilder::new("King Fahd Road", "Riyadh", "12345", "SA")
            .build()
            .unwrap(),
    )
    .build()
    .unwrap()
}

fn invoice(number: &str, compliant: bool) -> Invoice {
    let mut builder = InvoiceBuilder::new(number, issued())
        .seller(party("310122393500003"))
        .buyer(party("300000000000003"))
        .add_line(
            LineBuilder::new("1", "Laptop", dec!(2), dec!(3000.00))
                .build()
                .unwrap(),
        )
        .previous_invoice_hash("abc123def456");
    if compliant {
        builder = builder.qr_code("TlRBQj1BQkMgVHJhZGluZyBDb21wYW55");
    }
    builder.build().unwrap()
}

fn invoices(count: usize) -> Vec<Invoice> {
    (0..count)
        .map(|i| invoice(&format!("INV-{i:04}"), i % 3 != 0))
        .collect()
}

fn numbers(batch: &BatchResult) -> BTreeSet<String> {
    batch
        .results()
        .iter()
        .map(|r| r.invoice_number.clone())
        .collect()
}

/// Panics on invoices whose number contains "BOOM".
struct Faulty(Validator);

impl InvoiceValidator for Faulty {
    fn validate(&self, invoice: &Invoice) -> ValidationResult {
        if invoice.invoice_number.contains("BOOM") {
            panic!("rule engine exploded");
        }
        self.0.validate(invoice)
    }
}

fn write_json(dir: &Path, name: &str, number: &str) {
    let doc = json!({
        "invoice_number": number,
        "issue_date": issued().format("%Y-%m-%dT%H:%M:%S").to_string(),
        "seller": {
            "vat_number": "310122393500003",
            "name": "ABC Trading",
            "address": {"street": "King Fahd Road", "city": "Riyadh",
                        "postal_code": "12345", "country_code": "SA"}
        },
        "buyer": {
            "vat_number": "300000000000003",
            "name": "XYZ Corp",
            "address": {"street": "Olaya", "city": "Riyadh",
                        "postal_code": "12211", "country_code": "SA"}
        },
        "lines": [{"id": "1", "description": "Laptop", "quantity": "2", "unit_price": "3000.00"}],
        "previous_invoice_hash": "abc123def456",
        "qr_code": "TlRBQj1BQkMgVHJhZGluZyBDb21wYW55"
    });
    std::fs::write(dir.join(name), doc.to_string()).unwrap();
}

// --- Concurrent orchestrator ---

#[test]
fn every_invoice_gets_exactly_one_result() {
    let input = invoices(250);
    let expected: BTreeSet<String> = input.iter().map(|i| i.invoice_number.clone()).collect();

    for workers in [1, 2, 8] {
        let batch = ConcurrentValidator::default()
            .workers(workers)
            .validate_many(&input)
            .unwrap();
        assert_eq!(batch.total(), 250, "workers={workers}");
        assert_eq!(batch.results().len(), 250);
        assert_eq!(numbers(&batch), expected);
        assert_eq!(batch.compliant_count() + batch.failed_count(), 250);
        assert_eq!(batch.failed_count(), 84);
    }
}

#[test]
fn callback_fires_once_per_result() {
    let input = invoices(40);
    let mut seen = Vec::new();
    let batch = ConcurrentValidator::default()
        .workers(4)
        .validate_many_with(&input, |r| seen.push(r.invoice_number.clone()))
        .unwrap();

    assert_eq!(seen.len(), 40);
    let recorded: Vec<String> = batch
        .results()
        .iter()
        .map(|r| r.invoice_number.clone())
        .collect();
    assert_eq!(seen, recorded);
}

#[test]
fn empty_input_gives_empty_batch() {
    let batch = ConcurrentValidator::default().validate_many(&[]).unwrap();
    assert!(batch.is_empty());
    assert_eq!(batch.compliance_rate(), 0.0);
}

#[test]
fn zero_workers_is_a_config_error() {
    let err = ConcurrentValidator::default()
        .workers(0)
        .validate_many(&invoices(1))
        .unwrap_err();
    assert!(matches!(err, ComplianceError::Config(_)));
}

#[test]
fn panic_is_isolated_as_sys_001() {
    let mut input = invoices(20);
    input.push(invoice("INV-BOOM", true));

    let batch = ConcurrentValidator::with_factory(|| Faulty(Validator::default()))
        .workers(3)
        .validate_many(&input)
        .unwrap();

    assert_eq!(batch.total(), 21);
    let faulted: Vec<_> = batch
        .results()
        .iter()
        .filter(|r| r.has_code(codes::SYS_CONCURRENT_FAULT))
        .collect();
    assert_eq!(faulted.len(), 1);
    let result = faulted[0];
    assert_eq!(result.invoice_number, "INV-BOOM");
    assert!(!result.is_compliant());
    assert_eq!(result.violations().len(), 1);
    assert_eq!(result.violations()[0].field, "system");
    assert!(result.violations()[0].message.contains("rule engine exploded"));
}

#[test]
fn engine_construction_panic_is_isolated() {
    let input = invoices(10);
    let built = AtomicUsize::new(0);
    let factory = || {
        if built.fetch_add(1, Ordering::SeqCst) == 3 {
            panic!("engine construction failed");
        }
        Validator::default()
    };

    let batch = ConcurrentValidator::with_factory(factory)
        .workers(2)
        .validate_many(&input)
        .unwrap();

    assert_eq!(batch.total(), 10);
    let expected: BTreeSet<String> = input.iter().map(|i| i.invoice_number.clone()).collect();
    assert_eq!(numbers(&batch), expected);
    let faulted: Vec<_> = batch
        .results()
        .iter()
        .filter(|r| r.has_code(codes::SYS_CONCURRENT_FAULT))
        .collect();
    assert_eq!(faulted.len(), 1);
    assert!(faulted[0].violations()[0].message.contains("engine construction failed"));
}

#[test]
fn sorting_restores_input_order() {
    let input = invoices(30);
    let mut batch = ConcurrentValidator::default()
        .workers(4)
        .validate_many(&input)
        .unwrap();
    batch.sort_by_invoice_number();
    let ordered: Vec<&str> = batch
        .results()
        .iter()
        .map(|r| r.invoice_number.as_str())
        .collect();
    let expected: Vec<&str> = input.iter().map(|i| i.invoice_number.as_str()).collect();
    assert_eq!(ordered, expected);
}

#[test]
fn metrics_sink_sees_every_validation() {
    let metrics = Arc::new(InMemoryMetrics::new());
    ConcurrentValidator::default()
        .workers(4)
        .metrics(metrics.clone())
        .validate_many(&invoices(50))
        .unwrap();
    assert_eq!(metrics.count(VALIDATION_TIME_MS), 50);
}

#[test]
fn results_carry_processing_time() {
    let batch = ConcurrentValidator::default()
        .workers(2)
        .validate_many(&invoices(5))
        .unwrap();
    assert!(batch.results().iter().all(|r| r.processing_time_ms.is_some()));
    assert!(batch.processing_time_seconds > 0.0);
}

#[test]
fn directory_variant_skips_unparseable_files() {
    let dir = tempfile::tempdir().unwrap();
    write_json(dir.path(), "a.json", "INV-A");
    write_json(dir.path(), "b.json", "INV-B");
    std::fs::write(dir.path().join("broken.json"), "{ not json").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let mut calls = 0;
    let batch = ConcurrentValidator::default()
        .workers(2)
        .validate_directory(dir.path(), "*.json", |_| calls += 1)
        .unwrap();

    assert_eq!(batch.total(), 2);
    assert_eq!(calls, 2);
    assert_eq!(batch.compliant_count(), 2);
}

#[test]
fn directory_variant_missing_dir() {
    let err = ConcurrentValidator::default()
        .validate_directory(Path::new("/nonexistent/invoices"), "*.json", |_| {})
        .unwrap_err();
    assert!(matches!(err, ProcessingError::Source(_)));
}

// --- Streaming batch processor ---

#[test]
fn sequential_preserves_input_order() {
    let input = invoices(12);
    let mut order = Vec::new();
    let batch = BatchProcessor::default()
        .process_invoices(input.clone(), |r| order.push(r.invoice_number.clone()));

    let expected: Vec<String> = input.iter().map(|i| i.invoice_number.clone()).collect();
    assert_eq!(order, expected);
    assert_eq!(batch.total(), 12);
    assert_eq!(batch.failed_count(), 4);
}

#[test]
fn sequential_matches_engine_semantics() {
    let input = invoices(9);
    let engine = Validator::default();
    let batch = BatchProcessor::default().process_invoices(input.clone(), |_| {});
    for (inv, result) in input.iter().zip(batch.results()) {
        assert_eq!(result.codes(), engine.validate(inv).codes());
    }
}

#[test]
fn sequential_skips_load_errors() {
    let source: Vec<Result<Invoice, String>> = vec![
        Ok(invoice("INV-1", true)),
        Err("corrupt file".to_string()),
        Ok(invoice("INV-2", false)),
    ];
    let mut calls = 0;
    let batch = BatchProcessor::default().process(source, |_| calls += 1);
    assert_eq!(batch.total(), 2);
    assert_eq!(calls, 2);
    assert_eq!(batch.failed_count(), 1);
}

#[test]
fn sequential_panic_becomes_sys_002() {
    let input = vec![
        invoice("INV-1", true),
        invoice("INV-BOOM", true),
        invoice("INV-3", true),
    ];
    let batch = BatchProcessor::with_validator(Faulty(Validator::default()))
        .process_invoices(input, |_| {});

    assert_eq!(batch.total(), 3);
    assert_eq!(batch.compliant_count(), 2);
    let failed: Vec<_> = batch.failed().collect();
    assert_eq!(failed[0].invoice_number, "INV-BOOM");
    assert_eq!(failed[0].codes(), vec![codes::SYS_SEQUENTIAL_FAULT]);
}

#[test]
fn sequential_directory_writes_per_invoice_reports() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_json(input.path(), "one.json", "INV/2024/1");
    write_json(input.path(), "two.json", "INV-2");

    let out_dir = output.path().join("per-invoice");
    let batch = BatchProcessor::default()
        .process_directory(input.path(), "*.json", Some(&out_dir))
        .unwrap();

    assert_eq!(batch.total(), 2);
    assert!(out_dir.join("INV_2024_1.json").is_file());
    let written = std::fs::read_to_string(out_dir.join("INV-2.json")).unwrap();
    let result: ValidationResult = serde_json::from_str(&written).unwrap();
    assert_eq!(result.invoice_number, "INV-2");
    assert!(result.is_compliant());
}

// --- Chunked processor ---

#[test]
fn chunked_processes_everything() {
    let input = invoices(23);
    let mut calls = 0;
    let batch = ChunkedProcessor::new(ValidatorConfig::default())
        .chunk_size(5)
        .workers(2)
        .process(input.into_iter().map(Ok::<_, String>), |_| calls += 1)
        .unwrap();
    assert_eq!(batch.total(), 23);
    assert_eq!(calls, 23);
    assert_eq!(batch.failed_count(), 8);
}

#[test]
fn chunked_skips_errors_and_rejects_zero_chunk() {
    let source: Vec<Result<Invoice, String>> =
        vec![Ok(invoice("INV-1", true)), Err("bad".into()), Ok(invoice("INV-2", true))];
    let batch = ChunkedProcessor::new(ValidatorConfig::default())
        .chunk_size(1)
        .workers(1)
        .process(source, |_| {})
        .unwrap();
    assert_eq!(batch.total(), 2);

    let err = ChunkedProcessor::new(ValidatorConfig::default())
        .chunk_size(0)
        .process(Vec::<Result<Invoice, String>>::new(), |_| {})
        .unwrap_err();
    assert!(matches!(err, ComplianceError::Config(_)));
}

#[test]
fn chunked_directory() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..7 {
        write_json(dir.path(), &format!("inv_{i}.json"), &format!("INV-{i}"));
    }
    let batch = ChunkedProcessor::new(ValidatorConfig::default())
        .chunk_size(3)
        .process_directory(dir.path(), "inv_?.json", |_| {})
        .unwrap();
    assert_eq!(batch.total(), 7);
    assert_eq!(batch.compliant_count(), 7);
}
