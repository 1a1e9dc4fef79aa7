use crate::core::{BatchResult, ValidationResult};

/// Pretty-printed dump of the whole batch, every result included.
pub fn json_report(batch: &BatchResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(batch)
}

/// Pretty-printed single result, as written per invoice.
pub fn result_json(result: &ValidationResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(result)
}
