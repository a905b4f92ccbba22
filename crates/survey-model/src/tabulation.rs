//! Tabulation requests and results.

use serde::{Deserialize, Serialize};

use crate::category::{Category, FieldSelector};

/// One requested table.
///
/// The weight column is always explicit; there is no ambient weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulationRequest {
    pub name: String,
    pub rows: FieldSelector,
    pub columns: Option<FieldSelector>,
    pub stratum: Option<FieldSelector>,
    pub weight: String,
    /// Exclude records whose category is missing in any table dimension.
    #[serde(default)]
    pub drop_missing: bool,
}

impl TabulationRequest {
    pub fn one_way(name: impl Into<String>, rows: FieldSelector, weight: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows,
            columns: None,
            stratum: None,
            weight: weight.into(),
            drop_missing: false,
        }
    }

    pub fn two_way(
        name: impl Into<String>,
        rows: FieldSelector,
        columns: FieldSelector,
        weight: impl Into<String>,
    ) -> Self {
        Self {
            columns: Some(columns),
            ..Self::one_way(name, rows, weight)
        }
    }

    #[must_use]
    pub fn stratified_by(mut self, stratum: FieldSelector) -> Self {
        self.stratum = Some(stratum);
        self
    }

    #[must_use]
    pub fn with_drop_missing(mut self, enable: bool) -> Self {
        self.drop_missing = enable;
        self
    }
}

/// One dimension of a table: the selected field and its ordered levels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub field: String,
    pub levels: Vec<Category>,
}

/// Aggregate of one cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightedCount {
    pub weight: f64,
    pub records: usize,
    /// Share of the row's weight, in percent.
    pub row_percent: f64,
    /// Share of the column's weight, in percent.
    pub column_percent: f64,
    /// Share of the table's weight, in percent.
    pub total_percent: f64,
}

/// Records left out of a table, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusions {
    pub missing_weight: usize,
    pub negative_weight: usize,
    /// Only populated when the request sets `drop_missing`.
    pub missing_category: usize,
}

impl Exclusions {
    pub fn total(&self) -> usize {
        self.missing_weight + self.negative_weight + self.missing_category
    }
}

/// Pearson chi-square test of independence for a two-way table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChiSquareTest {
    pub statistic: f64,
    pub degrees_of_freedom: usize,
    pub p_value: f64,
    /// Cells whose expected record count falls below the configured minimum.
    pub low_expected_cells: usize,
    pub evaluated_cells: usize,
    pub low_expected_warning: bool,
}

/// The stratum a result belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StratumLevel {
    pub field: String,
    pub level: Category,
}

/// A computed table. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabulationResult {
    pub name: String,
    pub weight: String,
    pub stratum: Option<StratumLevel>,
    pub rows: Dimension,
    /// `None` for single-dimension tables.
    pub columns: Option<Dimension>,
    /// `cells[row][column]`; single-dimension tables have one column.
    pub cells: Vec<Vec<WeightedCount>>,
    pub row_totals: Vec<f64>,
    pub column_totals: Vec<f64>,
    pub total_weight: f64,
    pub included_records: usize,
    pub excluded: Exclusions,
    pub test: Option<ChiSquareTest>,
}

impl TabulationResult {
    pub fn is_two_way(&self) -> bool {
        self.columns.is_some()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&WeightedCount> {
        self.cells.get(row).and_then(|cells| cells.get(column))
    }
}

/// Outcome of one table (or one stratum of a stratified table) in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TableOutcome {
    Computed(TabulationResult),
    Skipped {
        name: String,
        stratum: Option<StratumLevel>,
        reason: String,
    },
}

impl TableOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Computed(result) => &result.name,
            Self::Skipped { name, .. } => name,
        }
    }

    pub fn stratum(&self) -> Option<&StratumLevel> {
        match self {
            Self::Computed(result) => result.stratum.as_ref(),
            Self::Skipped { stratum, .. } => stratum.as_ref(),
        }
    }

    pub fn result(&self) -> Option<&TabulationResult> {
        match self {
            Self::Computed(result) => Some(result),
            Self::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}
