//! Report generation for survey tabulation runs.
//!
//! - **results.json**: every table outcome, computed or skipped
//! - **cells.csv**: one row per computed cell
//! - **run_report.json**: input fingerprints, module quality, merge and
//!   derivation summaries, and issues

mod cells;
mod common;
mod json;

use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use survey_model::{RunReport, TableOutcome};
use tracing::info;

pub use cells::{CellRow, cell_rows, write_cells, write_cells_csv};
pub use common::{CELLS_FILE, OutputPaths, RESULTS_FILE, RUN_REPORT_FILE};
pub use json::{ResultsDocument, RunReportDocument, write_results_json, write_run_report};

/// Writes all three outputs into `output_dir`.
pub fn write_outputs(
    output_dir: &Path,
    weight_column: &str,
    outcomes: &[TableOutcome],
    report: &RunReport,
) -> Result<OutputPaths> {
    let paths = OutputPaths::in_dir(output_dir);
    write_results_json(&paths.results, weight_column, outcomes)?;
    write_cells_csv(&paths.cells, outcomes)?;
    write_run_report(&paths.run_report, report, Utc::now())?;
    info!(dir = %output_dir.display(), tables = outcomes.len(), "wrote outputs");
    Ok(paths)
}
