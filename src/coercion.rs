//! Cell coercion rules shared by ingestion and aggregation

/// Text literals (compared case-insensitively) read as true for
/// boolean-like columns. Numeric text is handled separately: any finite
/// non-zero number is true.
pub const TRUTHY_LITERALS: &[&str] = &["yes", "true"];

/// Best-effort conversion of a raw cell to f64.
///
/// Empty, unparseable and NaN cells become `None`; coercion never fails.
pub fn coerce_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.is_nan() => None,
        Ok(v) => Some(v),
        Err(_) => None,
    }
}

/// Truthiness of a boolean-like cell, whether the export wrote it as a
/// number (`1`, `0`, `1.0`) or as text (`Yes`, `no`, `True`).
pub fn is_truthy(raw: &str) -> bool {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return false;
    }
    if let Ok(v) = trimmed.parse::<f64>() {
        return v.is_finite() && v != 0.0;
    }
    TRUTHY_LITERALS
        .iter()
        .any(|literal| trimmed.eq_ignore_ascii_case(literal))
}

/// Numbers are written in their shortest round-trip form
pub fn format_number(value: f64) -> String {
    value.to_string()
}
