//! Pearson chi-square test of independence.

use statrs::distribution::{ChiSquared, ContinuousCDF};
use survey_model::{ChiSquareTest, TabulationSettings};

use crate::error::{Result, TabulationError};

/// Observed totals for the evaluated cells of a two-way table.
///
/// Cells whose expected count is zero add nothing to the statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct ContingencyTable {
    /// Weighted totals, already scaled.
    pub observed: Vec<Vec<f64>>,
    /// Unweighted record counts for the same cells.
    pub records: Vec<Vec<usize>>,
}

fn margins(cells: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>, f64) {
    let columns = cells.first().map_or(0, Vec::len);
    let rows: Vec<f64> = cells.iter().map(|row| row.iter().sum()).collect();
    let cols: Vec<f64> = (0..columns)
        .map(|j| cells.iter().map(|row| row[j]).sum())
        .collect();
    let total = rows.iter().sum();
    (rows, cols, total)
}

/// Pearson statistic, degrees of freedom and p-value.
pub fn pearson(table: &ContingencyTable, settings: &TabulationSettings) -> Result<ChiSquareTest> {
    let (row_totals, col_totals, total) = margins(&table.observed);
    let (r, c) = (row_totals.len(), col_totals.len());
    if r < 2 {
        return Err(TabulationError::InsufficientData {
            dimension: "rows".to_string(),
            levels: r,
        });
    }
    if c < 2 {
        return Err(TabulationError::InsufficientData {
            dimension: "columns".to_string(),
            levels: c,
        });
    }

    let mut statistic = 0.0;
    for (i, row) in table.observed.iter().enumerate() {
        for (j, observed) in row.iter().enumerate() {
            let expected = row_totals[i] * col_totals[j] / total;
            if expected > 0.0 {
                let diff = observed - expected;
                statistic += diff * diff / expected;
            }
        }
    }

    let degrees_of_freedom = (r - 1) * (c - 1);
    let dist = ChiSquared::new(degrees_of_freedom as f64).map_err(|e| {
        TabulationError::Distribution {
            message: e.to_string(),
        }
    })?;
    let p_value = dist.sf(statistic);

    let (low_expected_cells, evaluated_cells) =
        low_expected(&table.records, settings.low_expected_count);
    let low_expected_warning = evaluated_cells > 0
        && (low_expected_cells as f64 / evaluated_cells as f64) > settings.low_expected_share;

    Ok(ChiSquareTest {
        statistic,
        degrees_of_freedom,
        p_value,
        low_expected_cells,
        evaluated_cells,
        low_expected_warning,
    })
}

/// Cells whose expected record count (from unweighted margins) is below `minimum`.
fn low_expected(records: &[Vec<usize>], minimum: f64) -> (usize, usize) {
    let counts: Vec<Vec<f64>> = records
        .iter()
        .map(|row| row.iter().map(|n| *n as f64).collect())
        .collect();
    let (row_totals, col_totals, total) = margins(&counts);
    let evaluated = row_totals.len() * col_totals.len();
    if total <= 0.0 {
        return (evaluated, evaluated);
    }
    let low = row_totals
        .iter()
        .flat_map(|r| col_totals.iter().map(move |c| r * c / total))
        .filter(|expected| *expected < minimum)
        .count();
    (low, evaluated)
}
