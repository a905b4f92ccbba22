//! Data model for the blood-pressure survey analysis.

pub mod category;
pub mod config;
pub mod error;
pub mod ids;
pub mod record;
pub mod report;
pub mod table;
pub mod tabulation;

pub use category::{
    AgeBand, Category, DerivedField, DerivedLevel, DiabetesStatus, FieldSelector,
    HypertensionStatus, IncomeBand, MISSING_LABEL, RaceEthnicity, SeverityBand,
};
pub use config::{
    AgeCutPoints, AnalysisConfig, AxisThresholds, BpThresholds, ChiSquareScale, FieldNames,
    FlagCoding, IncomeCutPoints, ModuleSpec, SentinelConfig, TableSpec, TabulationSettings,
    load_config,
};
pub use error::ConfigError;
pub use ids::SubjectId;
pub use record::{Dataset, DerivedFields, SubjectRecord};
pub use report::{
    DerivationSummary, InputFingerprint, IssueKind, IssueSeverity, MergeSummary, ModuleQuality,
    RunIssue, RunReport,
};
pub use table::{ModuleTable, Row, Value};
pub use tabulation::{
    ChiSquareTest, Dimension, Exclusions, StratumLevel, TableOutcome, TabulationRequest,
    TabulationResult, WeightedCount,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_report_counts() {
        let mut report = RunReport::default();
        report.push_issue(RunIssue::module_issue(
            IssueSeverity::Warning,
            IssueKind::ModuleExcluded,
            "OCQ",
            "missing identifier column SEQN",
        ));
        report.push_issue(
            RunIssue::table_issue(
                IssueSeverity::Error,
                IssueKind::TableSkipped,
                "severity_by_work_schedule_by_age",
                "insufficient data",
            )
            .with_count(0),
        );
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.warning_count(), 1);
        assert!(report.has_errors());
        assert_eq!(report.issues_of(IssueKind::ModuleExcluded).count(), 1);
    }

    #[test]
    fn outcome_serializes_with_status_tag() {
        let outcome = TableOutcome::Skipped {
            name: "t".to_string(),
            stratum: None,
            reason: "insufficient data".to_string(),
        };
        let json = serde_json::to_value(&outcome).expect("serialize outcome");
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "insufficient data");
    }
}
