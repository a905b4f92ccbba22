//! Survey-weighted tabulation.
//!
//! One- and two-way tables of weighted counts and percentages, optionally
//! stratified, with a Pearson chi-square test for two-way tables.

mod chi_square;
mod engine;
mod error;
mod select;

pub use chi_square::{ContingencyTable, pearson};
pub use engine::TabulationEngine;
pub use error::{Result, TabulationError};
pub use select::{ValueLabels, category_of, check_field, stratum_levels};
