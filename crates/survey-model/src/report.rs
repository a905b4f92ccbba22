//! Run-level provenance and data-quality report.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Module failed schema screening and took no part in the merge.
    ModuleExcluded,
    /// Module file was not found in the data directory.
    ModuleNotFound,
    /// Rows with a blank subject identifier were skipped.
    BlankIdentifier,
    /// A requested table (or one stratum of it) could not be computed.
    TableSkipped,
    /// Table computed, but too many cells have small expected counts.
    LowExpectedCells,
}

/// One entry in the run's error/warning log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunIssue {
    pub severity: IssueSeverity,
    pub kind: IssueKind,
    pub module: Option<String>,
    pub table: Option<String>,
    pub message: String,
    /// Number of affected rows or records, where meaningful.
    pub count: Option<usize>,
}

impl RunIssue {
    pub fn module_issue(
        severity: IssueSeverity,
        kind: IssueKind,
        module: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            module: Some(module.to_string()),
            table: None,
            message: message.into(),
            count: None,
        }
    }

    pub fn table_issue(
        severity: IssueSeverity,
        kind: IssueKind,
        table: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            kind,
            module: None,
            table: Some(table.to_string()),
            message: message.into(),
            count: None,
        }
    }

    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }
}

/// SHA-256 fingerprint of one input file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFingerprint {
    pub module: String,
    pub path: String,
    pub sha256: String,
    pub bytes: u64,
}

/// Shape and missingness of one module after sentinel remapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleQuality {
    pub module: String,
    pub rows: usize,
    pub columns: usize,
    pub missing_by_column: BTreeMap<String, usize>,
    /// Cells remapped from a sentinel value to missing, per column.
    pub sentinel_replacements: BTreeMap<String, usize>,
}

impl ModuleQuality {
    pub fn total_missing(&self) -> usize {
        self.missing_by_column.values().sum()
    }

    pub fn total_replacements(&self) -> usize {
        self.sentinel_replacements.values().sum()
    }
}

/// Coverage of the outer join.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeSummary {
    pub subjects: usize,
    /// Subjects present in each module.
    pub rows_by_module: BTreeMap<String, usize>,
    /// Subjects absent from each module.
    pub missing_by_module: BTreeMap<String, usize>,
    /// Rows skipped per module because the identifier was blank.
    pub blank_ids_by_module: BTreeMap<String, usize>,
}

/// How many records ended up without each derived field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationSummary {
    pub records: usize,
    /// Records whose hypertension status could not be decided.
    pub indeterminate_hypertension: usize,
    /// Records with no value for each derived field, keyed by field name.
    pub missing_by_field: BTreeMap<String, usize>,
}

/// Everything the run learned about its inputs, apart from the tables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub inputs: Vec<InputFingerprint>,
    pub modules: Vec<ModuleQuality>,
    pub merge: Option<MergeSummary>,
    pub derivation: Option<DerivationSummary>,
    pub issues: Vec<RunIssue>,
}

impl RunReport {
    pub fn push_issue(&mut self, issue: RunIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Error)
            .count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| issue.severity == IssueSeverity::Warning)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &RunIssue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }
}
