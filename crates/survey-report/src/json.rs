//! JSON documents: tabulation results and the run report.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use survey_model::{RunReport, TableOutcome};

use crate::common::create_file;

/// Top-level layout of `results.json`.
///
/// Holds no timestamps so that identical inputs give identical bytes.
#[derive(Debug, Serialize)]
pub struct ResultsDocument<'a> {
    pub tool_version: &'static str,
    pub weight_column: &'a str,
    pub computed: usize,
    pub skipped: usize,
    pub tables: &'a [TableOutcome],
}

impl<'a> ResultsDocument<'a> {
    pub fn new(weight_column: &'a str, tables: &'a [TableOutcome]) -> Self {
        let skipped = tables.iter().filter(|t| t.is_skipped()).count();
        Self {
            tool_version: env!("CARGO_PKG_VERSION"),
            weight_column,
            computed: tables.len() - skipped,
            skipped,
            tables,
        }
    }
}

/// Top-level layout of `run_report.json`.
#[derive(Debug, Serialize)]
pub struct RunReportDocument<'a> {
    pub tool_version: &'static str,
    pub generated_at: DateTime<Utc>,
    pub errors: usize,
    pub warnings: usize,
    #[serde(flatten)]
    pub report: &'a RunReport,
}

impl<'a> RunReportDocument<'a> {
    pub fn new(report: &'a RunReport, generated_at: DateTime<Utc>) -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION"),
            generated_at,
            errors: report.error_count(),
            warnings: report.warning_count(),
            report,
        }
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = create_file(path)?;
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("serialize {}", path.display()))?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn write_results_json(
    path: &Path,
    weight_column: &str,
    outcomes: &[TableOutcome],
) -> Result<()> {
    write_json(path, &ResultsDocument::new(weight_column, outcomes))
}

pub fn write_run_report(path: &Path, report: &RunReport, generated_at: DateTime<Utc>) -> Result<()> {
    write_json(path, &RunReportDocument::new(report, generated_at))
}
