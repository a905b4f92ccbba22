//! Schema screening, merge and derivation as one step.

use survey_model::{
    AnalysisConfig, Dataset, DerivationSummary, IssueKind, IssueSeverity, MergeSummary,
    ModuleTable, RunIssue,
};
use tracing::warn;

use crate::derive::{DerivationRules, derive_dataset};
use crate::error::MergeError;
use crate::merge::merge_modules;

/// The analysis dataset plus everything learned while building it.
#[derive(Debug, Clone)]
pub struct PreparedDataset {
    pub dataset: Dataset,
    pub merge: MergeSummary,
    pub derivation: DerivationSummary,
    pub issues: Vec<RunIssue>,
}

/// Tables that passed screening, plus the names of those that did not.
#[derive(Debug, Clone, Default)]
pub struct ScreenedModules {
    pub kept: Vec<ModuleTable>,
    pub excluded: Vec<String>,
    pub issues: Vec<RunIssue>,
}

/// Drops tables without the identifier column, reporting each one.
///
/// A required module without the identifier is a `Schema` error.
pub fn screen_modules(
    tables: Vec<ModuleTable>,
    config: &AnalysisConfig,
) -> Result<ScreenedModules, MergeError> {
    let id_column = config.id_column.as_str();
    let mut screened = ScreenedModules {
        kept: Vec::with_capacity(tables.len()),
        ..ScreenedModules::default()
    };

    for table in tables {
        if table.has_column(id_column) {
            screened.kept.push(table);
            continue;
        }
        let required = config.module(&table.name).is_some_and(|spec| spec.required);
        if required {
            return Err(MergeError::Schema {
                module: table.name,
                column: id_column.to_string(),
            });
        }
        warn!(
            module = %table.name,
            rows = table.rows.len(),
            "module has no identifier column; excluded from merge"
        );
        screened.issues.push(
            RunIssue::module_issue(
                IssueSeverity::Warning,
                IssueKind::ModuleExcluded,
                &table.name,
                format!(
                    "no {id_column} column; its rows were excluded and every subject lacks this module"
                ),
            )
            .with_count(table.rows.len()),
        );
        screened.excluded.push(table.name);
    }
    Ok(screened)
}

/// Screens, merges and derives.
pub fn prepare_dataset(
    tables: Vec<ModuleTable>,
    config: &AnalysisConfig,
) -> Result<PreparedDataset, MergeError> {
    let ScreenedModules {
        kept,
        excluded,
        mut issues,
    } = screen_modules(tables, config)?;
    let merged = merge_modules(&kept, &excluded, &config.id_column)?;

    for (module, rows) in &merged.summary.blank_ids_by_module {
        issues.push(
            RunIssue::module_issue(
                IssueSeverity::Warning,
                IssueKind::BlankIdentifier,
                module,
                "rows with a blank identifier were skipped",
            )
            .with_count(*rows),
        );
    }

    let mut dataset = merged.dataset;
    let rules = DerivationRules::from_config(config);
    let derivation = derive_dataset(&mut dataset, &rules);

    Ok(PreparedDataset {
        dataset,
        merge: merged.summary,
        derivation,
        issues,
    })
}
