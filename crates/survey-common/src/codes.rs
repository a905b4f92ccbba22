//! Survey code normalization and ordering.

use std::cmp::Ordering;

use crate::polars::{format_numeric, parse_f64};

/// Normalizes a raw code: trims whitespace and canonicalizes numeric text.
///
/// Returns `None` for blank input.
///
/// # Examples
///
/// ```
/// use survey_common::normalize_code;
///
/// assert_eq!(normalize_code(" 4.0 "), Some("4".to_string()));
/// assert_eq!(normalize_code("0093703"), Some("93703".to_string()));
/// assert_eq!(normalize_code("NH"), Some("NH".to_string()));
/// assert_eq!(normalize_code("  "), None);
/// ```
pub fn normalize_code(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match parse_f64(trimmed) {
        Some(number) if number.is_finite() => Some(format_numeric(number)),
        _ => Some(trimmed.to_string()),
    }
}

/// Orders codes numerically when both parse as numbers, otherwise lexically.
///
/// Numeric codes sort before non-numeric ones so `2 < 10 < "A"`.
pub fn natural_cmp(left: &str, right: &str) -> Ordering {
    match (parse_f64(left), parse_f64(right)) {
        (Some(a), Some(b)) => a.total_cmp(&b).then_with(|| left.cmp(right)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.cmp(right),
    }
}
