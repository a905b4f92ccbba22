//! Flat per-cell export of computed tables.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use survey_model::{Category, TableOutcome, TabulationResult};

use crate::common::create_file;

const HEADER: [&str; 12] = [
    "table",
    "stratum_field",
    "stratum_level",
    "row_field",
    "row_level",
    "column_field",
    "column_level",
    "weight",
    "records",
    "row_percent",
    "column_percent",
    "total_percent",
];

/// One exported cell. Single-dimension tables leave the column fields empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellRow {
    pub table: String,
    pub stratum_field: String,
    pub stratum_level: String,
    pub row_field: String,
    pub row_level: String,
    pub column_field: String,
    pub column_level: String,
    pub weight: f64,
    pub records: usize,
    pub row_percent: f64,
    pub column_percent: f64,
    pub total_percent: f64,
}

/// Cells of every computed outcome, in outcome then row-major order.
pub fn cell_rows(outcomes: &[TableOutcome]) -> Vec<CellRow> {
    outcomes
        .iter()
        .filter_map(TableOutcome::result)
        .flat_map(result_rows)
        .collect()
}

fn result_rows(result: &TabulationResult) -> Vec<CellRow> {
    let (stratum_field, stratum_level) = result
        .stratum
        .as_ref()
        .map(|s| (s.field.clone(), s.level.label().to_string()))
        .unwrap_or_default();
    let column_field = result
        .columns
        .as_ref()
        .map(|c| c.field.clone())
        .unwrap_or_default();

    let mut rows = Vec::new();
    for (i, row_level) in result.rows.levels.iter().enumerate() {
        for (j, count) in result.cells[i].iter().enumerate() {
            let column_level = result
                .columns
                .as_ref()
                .and_then(|c| c.levels.get(j))
                .map(Category::label)
                .unwrap_or_default();
            rows.push(CellRow {
                table: result.name.clone(),
                stratum_field: stratum_field.clone(),
                stratum_level: stratum_level.clone(),
                row_field: result.rows.field.clone(),
                row_level: row_level.label().to_string(),
                column_field: column_field.clone(),
                column_level: column_level.to_string(),
                weight: count.weight,
                records: count.records,
                row_percent: count.row_percent,
                column_percent: count.column_percent,
                total_percent: count.total_percent,
            });
        }
    }
    rows
}

/// Writes the cell rows as CSV. The header is written even when no table was computed.
pub fn write_cells<W: Write>(writer: W, outcomes: &[TableOutcome]) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv_writer.write_record(HEADER).context("write cells header")?;
    for row in cell_rows(outcomes) {
        csv_writer
            .serialize(&row)
            .with_context(|| format!("serialize cell of {}", row.table))?;
    }
    csv_writer.flush().context("flush cells")?;
    Ok(())
}

pub fn write_cells_csv(path: &Path, outcomes: &[TableOutcome]) -> Result<()> {
    let writer = create_file(path)?;
    write_cells(writer, outcomes).with_context(|| format!("write {}", path.display()))
}
