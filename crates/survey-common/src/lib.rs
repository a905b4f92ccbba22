//! Shared utilities for the survey analysis crates.
//!
//! This crate provides Polars `AnyValue` coercion helpers and the
//! numeric-aware ordering used for subject identifiers and raw survey codes.

pub mod codes;
pub mod polars;

// Re-export commonly used functions at crate root for convenience
pub use codes::{natural_cmp, normalize_code};
pub use polars::{any_to_f64, any_to_string, format_numeric, parse_f64};
