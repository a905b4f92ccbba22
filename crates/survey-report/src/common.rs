//! Shared helpers for report generation.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// All tabulation outcomes, computed and skipped.
pub const RESULTS_FILE: &str = "results.json";

/// One row per table cell.
pub const CELLS_FILE: &str = "cells.csv";

/// Provenance, data quality and issues.
pub const RUN_REPORT_FILE: &str = "run_report.json";

/// Paths of the files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub results: PathBuf,
    pub cells: PathBuf,
    pub run_report: PathBuf,
}

impl OutputPaths {
    pub fn in_dir(output_dir: &Path) -> Self {
        Self {
            results: output_dir.join(RESULTS_FILE),
            cells: output_dir.join(CELLS_FILE),
            run_report: output_dir.join(RUN_REPORT_FILE),
        }
    }

    pub fn all(&self) -> [&Path; 3] {
        [&self.results, &self.cells, &self.run_report]
    }
}

pub(crate) fn create_file(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    Ok(BufWriter::new(file))
}
