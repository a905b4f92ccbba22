//! Derivation engine.
//!
//! Each derived field is a pure function of the record's module fields. A
//! field that cannot be computed becomes missing (or `Indeterminate`); the
//! record itself is never dropped.

pub mod blood_pressure;
pub mod demographics;

use std::collections::BTreeMap;

use survey_common::normalize_code;
use survey_model::{
    AgeCutPoints, AnalysisConfig, BpThresholds, Dataset, DerivationSummary, DerivedField,
    DerivedFields, FieldNames, HypertensionStatus, IncomeCutPoints, RaceEthnicity, SubjectRecord,
};
use tracing::{info, info_span};

use self::blood_pressure::{hypertension_status, replicate_mean, severity_band};
use self::demographics::{DiabetesCodes, age_band, diabetes_status, income_band, race_ethnicity};

/// Everything the derivations read from the configuration, with codes normalized.
#[derive(Debug, Clone)]
pub struct DerivationRules {
    pub fields: FieldNames,
    pub yes: String,
    pub no: String,
    pub diabetes: DiabetesCodes,
    pub thresholds: BpThresholds,
    pub age: AgeCutPoints,
    pub income: IncomeCutPoints,
    pub race_lookup: BTreeMap<String, RaceEthnicity>,
}

impl DerivationRules {
    pub fn from_config(config: &AnalysisConfig) -> Self {
        let code = |raw: &str| normalize_code(raw).unwrap_or_default();
        let yes = code(&config.flags.yes);
        let no = code(&config.flags.no);
        Self {
            fields: config.fields.clone(),
            diabetes: DiabetesCodes {
                diagnosed: yes.clone(),
                not_diagnosed: no.clone(),
                borderline: code(&config.flags.borderline),
            },
            yes,
            no,
            thresholds: config.thresholds,
            age: config.age,
            income: config.income,
            race_lookup: config
                .race_lookup
                .iter()
                .filter_map(|(raw, bucket)| normalize_code(raw).map(|c| (c, *bucket)))
                .collect(),
        }
    }

    /// Yes/no questionnaire flag. Refused, don't know and blanks are `None`.
    fn flag(&self, record: &SubjectRecord, column: &str) -> Option<bool> {
        let code = record.code(column)?;
        if code == self.yes {
            Some(true)
        } else if code == self.no {
            Some(false)
        } else {
            None
        }
    }
}

impl Default for DerivationRules {
    fn default() -> Self {
        Self::from_config(&AnalysisConfig::default())
    }
}

/// Computes every derived field for one record.
pub fn derive_record(record: &SubjectRecord, rules: &DerivationRules) -> DerivedFields {
    let fields = &rules.fields;
    let systolic_mean = replicate_mean(fields.systolic.iter().map(|c| record.number(c)));
    let diastolic_mean = replicate_mean(fields.diastolic.iter().map(|c| record.number(c)));

    let hypertension = hypertension_status(
        systolic_mean,
        diastolic_mean,
        rules.flag(record, &fields.told_high_bp),
        rules.flag(record, &fields.bp_medication),
        &rules.thresholds,
    );
    let severity = severity_band(systolic_mean, diastolic_mean, &rules.thresholds);

    DerivedFields {
        systolic_mean,
        diastolic_mean,
        hypertension,
        severity,
        race_ethnicity: race_ethnicity(record.code(&fields.race).as_deref(), &rules.race_lookup),
        age_band: age_band(record.number(&fields.age), &rules.age),
        income_band: income_band(record.number(&fields.income_ratio), &rules.income),
        diabetes: diabetes_status(record.code(&fields.diabetes).as_deref(), &rules.diabetes),
    }
}

/// Attaches derived fields to every record. Module fields are left untouched.
pub fn derive_dataset(dataset: &mut Dataset, rules: &DerivationRules) -> DerivationSummary {
    let span = info_span!("derive", records = dataset.len());
    let _guard = span.enter();

    let mut summary = DerivationSummary {
        records: dataset.len(),
        ..DerivationSummary::default()
    };
    for field in DerivedField::ALL {
        summary.missing_by_field.insert(field.name().to_string(), 0);
    }

    for record in &mut dataset.records {
        let derived = derive_record(record, rules);
        if derived.hypertension == HypertensionStatus::Indeterminate {
            summary.indeterminate_hypertension += 1;
        }
        for field in DerivedField::ALL {
            if derived.category(*field).is_missing()
                && let Some(count) = summary.missing_by_field.get_mut(field.name())
            {
                *count += 1;
            }
        }
        record.attach_derived(derived);
    }

    info!(
        records = summary.records,
        indeterminate = summary.indeterminate_hypertension,
        "derived analysis fields"
    );
    summary
}
