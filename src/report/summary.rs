use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::core::BatchResult;

const RULE_WIDTH: usize = 70;
const TOP_VIOLATIONS: usize = 10;
const LISTED_FAILURES: usize = 20;

/// Plain-text compliance report for a finished batch.
///
/// Lists the most frequent violation codes among non-compliant invoices
/// (ties broken by code) and the first non-compliant invoices with their
/// violations.
pub fn summary_report(batch: &BatchResult, generated_at: NaiveDateTime) -> String {
    let heavy = "=".repeat(RULE_WIDTH);
    let light = "-".repeat(RULE_WIDTH);
    let mut lines: Vec<String> = Vec::new();

    lines.push(heavy.clone());
    lines.push("ZATCA COMPLIANCE VALIDATION REPORT".into());
    lines.push(heavy.clone());
    lines.push(format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S")));
    lines.push(String::new());

    lines.push("SUMMARY STATISTICS".into());
    lines.push(light.clone());
    lines.push(format!("Total Invoices Processed:  {}", batch.total()));
    lines.push(format!(
        "Compliant:                 {} ({:.1}%)",
        batch.compliant_count(),
        batch.compliance_rate()
    ));
    lines.push(format!(
        "Non-Compliant:             {} ({:.1}%)",
        batch.failed_count(),
        batch.failure_rate()
    ));
    lines.push(format!(
        "Processing Time:           {:.2} seconds",
        batch.processing_time_seconds
    ));
    lines.push(format!(
        "Throughput:                {:.1} invoices/sec",
        batch.throughput()
    ));
    lines.push(String::new());

    if batch.failed_count() > 0 {
        lines.push("COMMON VIOLATIONS".into());
        lines.push(light.clone());
        for (code, count, example) in top_violations(batch) {
            lines.push(format!("[{code}] {example}"));
            lines.push(format!("  Occurrences: {count}"));
            lines.push(String::new());
        }

        lines.push("NON-COMPLIANT INVOICES".into());
        lines.push(light);
        for result in batch.failed().take(LISTED_FAILURES) {
            lines.push(format!("Invoice: {}", result.invoice_number));
            lines.push(format!("  Violations: {}", result.violations().len()));
            for v in result.violations() {
                lines.push(format!("    - [{}] {}", v.code, v.message));
            }
            lines.push(String::new());
        }
        if batch.failed_count() > LISTED_FAILURES {
            lines.push(format!(
                "... and {} more non-compliant invoices",
                batch.failed_count() - LISTED_FAILURES
            ));
            lines.push(String::new());
        }
    }

    lines.push(heavy.clone());
    lines.push("END OF REPORT".into());
    lines.push(heavy);
    lines.join("\n")
}

/// `(code, occurrences, first message seen)`, most frequent first.
fn top_violations(batch: &BatchResult) -> Vec<(&str, usize, &str)> {
    let mut counts: HashMap<&str, (usize, &str)> = HashMap::new();
    for result in batch.failed() {
        for v in result.violations() {
            counts
                .entry(v.code.as_str())
                .or_insert((0, v.message.as_str()))
                .0 += 1;
        }
    }

    let mut ranked: Vec<_> = counts
        .into_iter()
        .map(|(code, (count, example))| (code, count, example))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    ranked.truncate(TOP_VIOLATIONS);
    ranked
}
