//! Analysis configuration loaded from `analysis.toml`.
//!
//! Every section carries defaults for the 2017-2018 NHANES public-use files,
//! so an empty or partial file is a valid configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::category::{FieldSelector, RaceEthnicity};
use crate::error::ConfigError;
use crate::tabulation::TabulationRequest;

/// One survey module file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleSpec {
    pub name: String,
    /// Path relative to the data directory.
    pub file: String,
    /// A required module that fails schema screening aborts the run.
    #[serde(default)]
    pub required: bool,
}

impl ModuleSpec {
    pub fn new(name: &str, file: &str, required: bool) -> Self {
        Self {
            name: name.to_string(),
            file: file.to_string(),
            required,
        }
    }
}

/// Source columns consumed by the derivations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldNames {
    pub systolic: Vec<String>,
    pub diastolic: Vec<String>,
    pub told_high_bp: String,
    pub bp_medication: String,
    pub age: String,
    pub race: String,
    pub income_ratio: String,
    pub diabetes: String,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            systolic: strings(&["BPXSY1", "BPXSY2", "BPXSY3"]),
            diastolic: strings(&["BPXDI1", "BPXDI2", "BPXDI3"]),
            told_high_bp: "BPQ020".to_string(),
            bp_medication: "BPQ050A".to_string(),
            age: "RIDAGEYR".to_string(),
            race: "RIDRETH3".to_string(),
            income_ratio: "INDFMPIR".to_string(),
            diabetes: "DIQ010".to_string(),
        }
    }
}

/// Questionnaire answer codes. Any other code (refused, don't know) is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlagCoding {
    pub yes: String,
    pub no: String,
    /// Diabetes questionnaire code for "borderline".
    pub borderline: String,
}

impl Default for FlagCoding {
    fn default() -> Self {
        Self {
            yes: "1".to_string(),
            no: "2".to_string(),
            borderline: "3".to_string(),
        }
    }
}

/// Values that mean "not measured", remapped to missing at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Treat a diastolic reading of exactly 0 as missing.
    pub diastolic_zero_is_missing: bool,
    /// Extra per-column sentinel values.
    pub columns: BTreeMap<String, Vec<f64>>,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            diastolic_zero_is_missing: true,
            columns: BTreeMap::new(),
        }
    }
}

/// Cut points for one blood-pressure axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisThresholds {
    /// Lower bound of the elevated / stage 1 band.
    pub stage1: f64,
    /// Lower bound of the stage 2 band.
    pub stage2: f64,
    /// Readings strictly above this value are a crisis.
    pub crisis: f64,
}

/// Blood-pressure cut points (mmHg). Hypertension is positive at `stage1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BpThresholds {
    pub systolic: AxisThresholds,
    pub diastolic: AxisThresholds,
}

impl Default for BpThresholds {
    fn default() -> Self {
        Self {
            systolic: AxisThresholds {
                stage1: 130.0,
                stage2: 140.0,
                crisis: 180.0,
            },
            diastolic: AxisThresholds {
                stage1: 80.0,
                stage2: 90.0,
                crisis: 120.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgeCutPoints {
    pub adult_min: f64,
    pub middle_start: f64,
    pub older_start: f64,
}

impl Default for AgeCutPoints {
    fn default() -> Self {
        Self {
            adult_min: 18.0,
            middle_start: 40.0,
            older_start: 60.0,
        }
    }
}

/// Poverty-income-ratio cut points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeCutPoints {
    pub middle_start: f64,
    pub high_start: f64,
}

impl Default for IncomeCutPoints {
    fn default() -> Self {
        Self {
            middle_start: 1.3,
            high_start: 3.5,
        }
    }
}

/// Scale applied to weighted cell totals before the chi-square statistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChiSquareScale {
    /// Raw weighted totals.
    #[default]
    Weighted,
    /// Weights rescaled to sum to the included record count.
    Normalized,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabulationSettings {
    pub low_expected_count: f64,
    pub low_expected_share: f64,
    pub chi_square_scale: ChiSquareScale,
}

impl Default for TabulationSettings {
    fn default() -> Self {
        Self {
            low_expected_count: 5.0,
            low_expected_share: 0.2,
            chi_square_scale: ChiSquareScale::Weighted,
        }
    }
}

/// A requested table as written in the configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub rows: String,
    #[serde(default)]
    pub columns: Option<String>,
    #[serde(default)]
    pub stratum: Option<String>,
    /// Falls back to the global weight column.
    #[serde(default)]
    pub weight: Option<String>,
    #[serde(default)]
    pub drop_missing: bool,
}

impl TableSpec {
    fn new(name: &str, rows: &str, columns: Option<&str>, stratum: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            rows: rows.to_string(),
            columns: columns.map(str::to_string),
            stratum: stratum.map(str::to_string),
            weight: None,
            drop_missing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub id_column: String,
    pub weight_column: String,
    pub modules: Vec<ModuleSpec>,
    pub fields: FieldNames,
    pub flags: FlagCoding,
    pub sentinels: SentinelConfig,
    pub thresholds: BpThresholds,
    pub age: AgeCutPoints,
    pub income: IncomeCutPoints,
    /// Raw race/Hispanic-origin code to bucket.
    pub race_lookup: BTreeMap<String, RaceEthnicity>,
    /// Column to (code to label) maps used when rendering raw categorical columns.
    pub value_labels: BTreeMap<String, BTreeMap<String, String>>,
    pub tabulation: TabulationSettings,
    pub tables: Vec<TableSpec>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            id_column: "SEQN".to_string(),
            weight_column: "WTMEC2YR".to_string(),
            modules: vec![
                ModuleSpec::new("DEMO", "DEMO_J.csv", true),
                ModuleSpec::new("BPX", "BPX_J.csv", true),
                ModuleSpec::new("BPQ", "BPQ_J.csv", false),
                ModuleSpec::new("DIQ", "DIQ_J.csv", false),
                ModuleSpec::new("INQ", "INQ_J.csv", false),
                ModuleSpec::new("OCQ", "OCQ_J.csv", false),
            ],
            fields: FieldNames::default(),
            flags: FlagCoding::default(),
            sentinels: SentinelConfig::default(),
            thresholds: BpThresholds::default(),
            age: AgeCutPoints::default(),
            income: IncomeCutPoints::default(),
            race_lookup: default_race_lookup(),
            value_labels: default_value_labels(),
            tabulation: TabulationSettings::default(),
            tables: default_tables(),
        }
    }
}

fn default_race_lookup() -> BTreeMap<String, RaceEthnicity> {
    [
        ("1", RaceEthnicity::Hispanic),
        ("2", RaceEthnicity::Hispanic),
        ("3", RaceEthnicity::NonHispanicWhite),
        ("4", RaceEthnicity::NonHispanicBlack),
        ("6", RaceEthnicity::NonHispanicAsian),
        ("7", RaceEthnicity::NonHispanicOther),
    ]
    .into_iter()
    .map(|(code, bucket)| (code.to_string(), bucket))
    .collect()
}

fn default_value_labels() -> BTreeMap<String, BTreeMap<String, String>> {
    let work_schedule: BTreeMap<String, String> = [
        ("1", "Regular daytime"),
        ("2", "Regular evening"),
        ("3", "Regular night"),
        ("5", "Rotating or other"),
        ("7", "Refused"),
        ("9", "Don't know"),
    ]
    .into_iter()
    .map(|(code, label)| (code.to_string(), label.to_string()))
    .collect();
    BTreeMap::from([("OCQ670".to_string(), work_schedule)])
}

fn default_tables() -> Vec<TableSpec> {
    vec![
        TableSpec::new("hypertension", "hypertension", None, None),
        TableSpec::new(
            "hypertension_by_work_schedule",
            "hypertension",
            Some("OCQ670"),
            None,
        ),
        TableSpec::new(
            "severity_by_work_schedule_by_age",
            "hypertension_severity",
            Some("OCQ670"),
            Some("age_band"),
        ),
        TableSpec::new(
            "hypertension_by_race",
            "hypertension",
            Some("race_ethnicity"),
            None,
        ),
        TableSpec::new("hypertension_by_age", "hypertension", Some("age_band"), None),
        TableSpec::new(
            "hypertension_by_income",
            "hypertension",
            Some("income_band"),
            None,
        ),
        TableSpec::new(
            "hypertension_by_diabetes",
            "hypertension",
            Some("diabetes_status"),
            None,
        ),
    ]
}

impl AnalysisConfig {
    /// Parse and validate configuration text; `origin` names it in errors.
    pub fn from_toml_str(contents: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cut-point ordering and cross-references.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bp = &self.thresholds;
        check_increasing(
            "systolic thresholds",
            &[bp.systolic.stage1, bp.systolic.stage2, bp.systolic.crisis],
        )?;
        check_increasing(
            "diastolic thresholds",
            &[bp.diastolic.stage1, bp.diastolic.stage2, bp.diastolic.crisis],
        )?;
        check_increasing(
            "age cut points",
            &[self.age.adult_min, self.age.middle_start, self.age.older_start],
        )?;
        check_increasing(
            "income cut points",
            &[self.income.middle_start, self.income.high_start],
        )?;

        if self.id_column.trim().is_empty() {
            return Err(ConfigError::invalid("id_column must not be empty"));
        }
        if self.weight_column.trim().is_empty() {
            return Err(ConfigError::invalid("weight_column must not be empty"));
        }
        if self.fields.systolic.is_empty() || self.fields.diastolic.is_empty() {
            return Err(ConfigError::invalid(
                "fields.systolic and fields.diastolic need at least one column",
            ));
        }

        let settings = &self.tabulation;
        if settings.low_expected_count.is_nan() || settings.low_expected_count <= 0.0 {
            return Err(ConfigError::invalid(
                "tabulation.low_expected_count must be positive",
            ));
        }
        if !(0.0..=1.0).contains(&settings.low_expected_share) {
            return Err(ConfigError::invalid(
                "tabulation.low_expected_share must be between 0 and 1",
            ));
        }

        let mut module_names = BTreeSet::new();
        for module in &self.modules {
            if !module_names.insert(module.name.to_ascii_uppercase()) {
                return Err(ConfigError::invalid(format!(
                    "module {} is listed twice",
                    module.name
                )));
            }
        }

        let mut table_names = BTreeSet::new();
        for table in &self.tables {
            if table.name.trim().is_empty() {
                return Err(ConfigError::invalid("table name must not be empty"));
            }
            if !table_names.insert(table.name.as_str()) {
                return Err(ConfigError::invalid(format!(
                    "table {} is listed twice",
                    table.name
                )));
            }
        }
        Ok(())
    }

    /// Sentinel values per column, with the diastolic zero rule expanded.
    pub fn effective_sentinels(&self) -> BTreeMap<String, Vec<f64>> {
        let mut sentinels = self.sentinels.columns.clone();
        if self.sentinels.diastolic_zero_is_missing {
            for column in &self.fields.diastolic {
                let values = sentinels.entry(column.clone()).or_default();
                if !values.contains(&0.0) {
                    values.push(0.0);
                }
            }
        }
        sentinels
    }

    /// Tabulation requests with the global weight filled in.
    pub fn requests(&self) -> Vec<TabulationRequest> {
        self.tables
            .iter()
            .map(|table| TabulationRequest {
                name: table.name.clone(),
                rows: FieldSelector::parse(&table.rows),
                columns: table.columns.as_deref().map(FieldSelector::parse),
                stratum: table.stratum.as_deref().map(FieldSelector::parse),
                weight: table
                    .weight
                    .clone()
                    .unwrap_or_else(|| self.weight_column.clone()),
                drop_missing: table.drop_missing,
            })
            .collect()
    }

    pub fn module(&self, name: &str) -> Option<&ModuleSpec> {
        self.modules
            .iter()
            .find(|module| module.name.eq_ignore_ascii_case(name))
    }
}

/// Read, parse and validate a configuration file.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    AnalysisConfig::from_toml_str(&contents, path)
}

fn check_increasing(what: &str, values: &[f64]) -> Result<(), ConfigError> {
    let ordered = values.iter().all(|v| v.is_finite())
        && values.windows(2).all(|pair| pair[0] < pair[1]);
    if ordered {
        Ok(())
    } else {
        Err(ConfigError::Thresholds {
            message: format!("{what} must be finite and strictly increasing, got {values:?}"),
        })
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().copied().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<AnalysisConfig, ConfigError> {
        AnalysisConfig::from_toml_str(text, Path::new("analysis.toml"))
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.weight_column, "WTMEC2YR");
        assert_eq!(config.modules.len(), 6);
    }

    #[test]
    fn partial_threshold_override() {
        let config = parse(
            r#"
            [thresholds.systolic]
            stage1 = 120.0
            stage2 = 140.0
            crisis = 180.0
            "#,
        )
        .unwrap();
        assert_eq!(config.thresholds.systolic.stage1, 120.0);
        assert_eq!(config.thresholds.diastolic.stage1, 80.0);
    }

    #[test]
    fn unordered_thresholds_rejected() {
        let err = parse(
            r#"
            [thresholds.diastolic]
            stage1 = 90.0
            stage2 = 80.0
            crisis = 120.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Thresholds { .. }));
    }

    #[test]
    fn malformed_toml_names_the_file() {
        let err = parse("weight_column = [").unwrap_err();
        assert!(err.to_string().contains("analysis.toml"));
    }

    #[test]
    fn duplicate_table_names_rejected() {
        let err = parse(
            r#"
            [[tables]]
            name = "t"
            rows = "hypertension"

            [[tables]]
            name = "t"
            rows = "age_band"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    fn requests_fill_in_global_weight() {
        let config = parse(
            r#"
            weight_column = "WTINT2YR"

            [[tables]]
            name = "by_race"
            rows = "hypertension"
            columns = "race_ethnicity"

            [[tables]]
            name = "custom_weight"
            rows = "OCQ670"
            weight = "WTMEC2YR"
            "#,
        )
        .unwrap();
        let requests = config.requests();
        assert_eq!(requests[0].weight, "WTINT2YR");
        assert_eq!(requests[1].weight, "WTMEC2YR");
        assert_eq!(
            requests[1].rows,
            FieldSelector::Column("OCQ670".to_string())
        );
    }

    #[test]
    fn diastolic_zero_sentinel_expands() {
        let config = AnalysisConfig::default();
        let sentinels = config.effective_sentinels();
        assert_eq!(sentinels.get("BPXDI1"), Some(&vec![0.0]));
        assert!(!sentinels.contains_key("BPXSY1"));

        let mut disabled = AnalysisConfig::default();
        disabled.sentinels.diastolic_zero_is_missing = false;
        assert!(disabled.effective_sentinels().is_empty());
    }

    #[test]
    fn race_lookup_override_replaces_table() {
        let config = parse(
            r#"
            [race_lookup]
            "1" = "hispanic"
            "5" = "non_hispanic_other"
            "#,
        )
        .unwrap();
        assert_eq!(config.race_lookup.len(), 2);
        assert_eq!(
            config.race_lookup.get("5"),
            Some(&RaceEthnicity::NonHispanicOther)
        );
    }
}
