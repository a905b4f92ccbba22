#![deny(unsafe_code)]

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::category::{
    AgeBand, Category, DerivedField, DerivedLevel, DiabetesStatus, HypertensionStatus,
    IncomeBand, RaceEthnicity, SeverityBand,
};
use crate::ids::SubjectId;
use crate::table::{Row, Value};

static MISSING: Value = Value::Missing;

/// Fields computed by the derivation engine for one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedFields {
    pub systolic_mean: Option<f64>,
    pub diastolic_mean: Option<f64>,
    pub hypertension: HypertensionStatus,
    pub severity: Option<SeverityBand>,
    pub race_ethnicity: Option<RaceEthnicity>,
    pub age_band: Option<AgeBand>,
    pub income_band: Option<IncomeBand>,
    pub diabetes: Option<DiabetesStatus>,
}

impl DerivedFields {
    /// Category value of a derived field; undetermined fields map to `Missing`.
    pub fn category(&self, field: DerivedField) -> Category {
        match field {
            DerivedField::Hypertension => self.hypertension.to_category(),
            DerivedField::HypertensionSeverity => level_or_missing(self.severity),
            DerivedField::RaceEthnicity => level_or_missing(self.race_ethnicity),
            DerivedField::AgeBand => level_or_missing(self.age_band),
            DerivedField::IncomeBand => level_or_missing(self.income_band),
            DerivedField::DiabetesStatus => level_or_missing(self.diabetes),
        }
    }
}

fn level_or_missing<T: DerivedLevel>(level: Option<T>) -> Category {
    level.map_or(Category::Missing, DerivedLevel::to_category)
}

/// One merged row per subject.
///
/// Module fields are fixed once the merge engine builds the record; the
/// derivation engine only attaches `derived`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub id: SubjectId,
    pub fields: Row,
    /// Modules that contained this subject.
    pub modules: BTreeSet<String>,
    /// Modules that did not contain this subject and contributed only missing values.
    pub missing_modules: BTreeSet<String>,
    pub derived: Option<DerivedFields>,
}

impl SubjectRecord {
    pub fn new(id: SubjectId) -> Self {
        Self {
            id,
            fields: Row::new(),
            modules: BTreeSet::new(),
            missing_modules: BTreeSet::new(),
            derived: None,
        }
    }

    /// Value of a module column; absent columns read as `Missing`.
    pub fn value(&self, column: &str) -> &Value {
        self.fields.get(column).unwrap_or(&MISSING)
    }

    pub fn number(&self, column: &str) -> Option<f64> {
        self.value(column).as_f64()
    }

    pub fn code(&self, column: &str) -> Option<String> {
        self.value(column).as_code()
    }

    /// Attach derived fields. Module fields are never touched.
    pub fn attach_derived(&mut self, derived: DerivedFields) {
        self.derived = Some(derived);
    }

    /// Derived category, `Missing` when derivation has not run.
    pub fn derived_category(&self, field: DerivedField) -> Category {
        match &self.derived {
            Some(derived) => derived.category(field),
            None => Category::Missing,
        }
    }
}

/// The merged and derived analysis dataset, ordered by subject ID.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Modules that took part in the merge, in input order.
    pub modules: Vec<String>,
    pub records: Vec<SubjectRecord>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn underived_record_reads_missing() {
        let record = SubjectRecord::new(SubjectId::parse("1").unwrap());
        assert!(record.value("BPXSY1").is_missing());
        assert!(record.derived_category(DerivedField::AgeBand).is_missing());
    }

    #[test]
    fn indeterminate_is_a_level_not_missing() {
        let derived = DerivedFields::default();
        let category = derived.category(DerivedField::Hypertension);
        assert_eq!(category.code(), Some("indeterminate"));
    }
}
