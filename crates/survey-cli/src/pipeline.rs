//! Pipeline stages for a full analysis run.
//!
//! Stages run in order: configuration, ingest, prepare (screen, merge,
//! derive), tabulate, output. Ingest and prepare failures abort the run;
//! tabulation failures are recorded per table and the run continues.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use survey_ingest::{LoadOutcome, load_modules};
use survey_model::{
    AnalysisConfig, Dataset, IssueKind, IssueSeverity, RunIssue, RunReport, TableOutcome,
    load_config,
};
use survey_report::{OutputPaths, write_outputs};
use survey_tabulate::TabulationEngine;
use survey_transform::{PreparedDataset, prepare_dataset};
use tracing::{info, info_span, trace};

use crate::logging::redact_value;

/// Configuration file picked up from the data directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "analysis.toml";

/// Exit status when every table was produced.
pub const EXIT_OK: i32 = 0;
/// Exit status for fatal errors.
pub const EXIT_FAILURE: i32 = 1;
/// Exit status when some tables were skipped.
pub const EXIT_PARTIAL: i32 = 2;

/// Resolves the analysis configuration.
///
/// An explicit path must exist. Without one, `<data_dir>/analysis.toml` is used
/// when present, otherwise the built-in defaults. The weight override replaces
/// the global weight column before validation.
pub fn resolve_config(
    data_dir: &Path,
    config_path: Option<&Path>,
    weight: Option<&str>,
) -> Result<AnalysisConfig> {
    let candidate = data_dir.join(DEFAULT_CONFIG_FILE);
    let mut config = match config_path {
        Some(path) => {
            load_config(path).with_context(|| format!("load config {}", path.display()))?
        }
        None if candidate.is_file() => load_config(&candidate)
            .with_context(|| format!("load config {}", candidate.display()))?,
        None => AnalysisConfig::default(),
    };
    if let Some(weight) = weight {
        config.weight_column = weight.to_string();
    }
    config.validate().context("validate config")?;
    Ok(config)
}

/// Loaded and prepared data, before tabulation.
#[derive(Debug)]
pub struct PreparedRun {
    pub loaded: LoadOutcome,
    pub prepared: PreparedDataset,
    pub report: RunReport,
}

/// Ingest and prepare stages; the returned report carries their provenance and issues.
pub fn prepare(data_dir: &Path, config: &AnalysisConfig) -> Result<PreparedRun> {
    let start = Instant::now();
    let loaded = load_modules(data_dir, config)
        .with_context(|| format!("load survey modules from {}", data_dir.display()))?;
    info!(
        modules = loaded.modules.len(),
        duration_ms = start.elapsed().as_millis(),
        "ingest complete"
    );

    let start = Instant::now();
    let prepared = prepare_dataset(loaded.tables(), config).context("merge and derive")?;
    info!(
        subjects = prepared.dataset.len(),
        indeterminate = prepared.derivation.indeterminate_hypertension,
        duration_ms = start.elapsed().as_millis(),
        "prepare complete"
    );
    trace_records(&prepared.dataset);

    let mut report = RunReport {
        inputs: loaded.fingerprints(),
        modules: loaded.qualities(),
        merge: Some(prepared.merge.clone()),
        derivation: Some(prepared.derivation.clone()),
        issues: Vec::new(),
    };
    for issue in loaded.issues.iter().chain(&prepared.issues) {
        report.push_issue(issue.clone());
    }

    Ok(PreparedRun {
        loaded,
        prepared,
        report,
    })
}

fn trace_records(dataset: &Dataset) {
    for record in dataset.records.iter().take(5) {
        trace!(
            subject = redact_value(record.id.as_str()),
            derived = ?record.derived.as_ref().map(|d| d.hypertension),
            "derived record"
        );
    }
}

/// Result of a complete run.
#[derive(Debug)]
pub struct RunResult {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub subjects: usize,
    pub outcomes: Vec<TableOutcome>,
    pub report: RunReport,
    /// `None` for dry runs.
    pub outputs: Option<OutputPaths>,
}

impl RunResult {
    pub fn skipped(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn exit_code(&self) -> i32 {
        if self.skipped() > 0 { EXIT_PARTIAL } else { EXIT_OK }
    }
}

/// Records skipped tables and low expected counts in the run report.
pub fn record_table_issues(report: &mut RunReport, outcomes: &[TableOutcome]) {
    for outcome in outcomes {
        let stratum = outcome
            .stratum()
            .map(|s| format!(" [{} = {}]", s.field, s.level.label()))
            .unwrap_or_default();
        match outcome {
            TableOutcome::Skipped { name, reason, .. } => {
                report.push_issue(RunIssue::table_issue(
                    IssueSeverity::Warning,
                    IssueKind::TableSkipped,
                    name,
                    format!("{reason}{stratum}"),
                ));
            }
            TableOutcome::Computed(result) => {
                if let Some(test) = result.test
                    && test.low_expected_warning
                {
                    report.push_issue(
                        RunIssue::table_issue(
                            IssueSeverity::Warning,
                            IssueKind::LowExpectedCells,
                            &result.name,
                            format!(
                                "{} of {} cells have expected counts below the minimum{stratum}",
                                test.low_expected_cells, test.evaluated_cells
                            ),
                        )
                        .with_count(test.low_expected_cells),
                    );
                }
            }
        }
    }
}

/// Runs every stage and writes the outputs unless `dry_run` is set.
pub fn run_analysis(
    data_dir: &Path,
    output_dir: &Path,
    config: &AnalysisConfig,
    dry_run: bool,
) -> Result<RunResult> {
    let span = info_span!("run", data_dir = %data_dir.display());
    let _guard = span.enter();

    let PreparedRun {
        prepared, mut report, ..
    } = prepare(data_dir, config)?;

    let engine = TabulationEngine::from_config(config);
    let outcomes = engine.run_batch(&prepared.dataset, &config.requests());
    record_table_issues(&mut report, &outcomes);

    let outputs = if dry_run {
        None
    } else {
        Some(
            write_outputs(output_dir, &config.weight_column, &outcomes, &report)
                .with_context(|| format!("write outputs to {}", output_dir.display()))?,
        )
    };

    Ok(RunResult {
        data_dir: data_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        subjects: prepared.dataset.len(),
        outcomes,
        report,
        outputs,
    })
}
