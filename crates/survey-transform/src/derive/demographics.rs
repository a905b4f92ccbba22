//! Demographic and history categories.

use std::collections::BTreeMap;

use survey_model::{AgeBand, AgeCutPoints, DiabetesStatus, IncomeBand, IncomeCutPoints, RaceEthnicity};

/// Looks up a race/Hispanic-origin code. Unmapped codes are missing.
pub fn race_ethnicity(
    code: Option<&str>,
    lookup: &BTreeMap<String, RaceEthnicity>,
) -> Option<RaceEthnicity> {
    lookup.get(code?).copied()
}

/// Adult age band; ages under the adult minimum are out of the analytic population.
pub fn age_band(age: Option<f64>, cuts: &AgeCutPoints) -> Option<AgeBand> {
    let age = age?;
    if age < cuts.adult_min {
        None
    } else if age < cuts.middle_start {
        Some(AgeBand::YoungAdult)
    } else if age < cuts.older_start {
        Some(AgeBand::MiddleAge)
    } else {
        Some(AgeBand::OlderAdult)
    }
}

/// Income band from the family poverty-income ratio. Negative ratios are invalid.
pub fn income_band(ratio: Option<f64>, cuts: &IncomeCutPoints) -> Option<IncomeBand> {
    let ratio = ratio?;
    if ratio < 0.0 {
        None
    } else if ratio < cuts.middle_start {
        Some(IncomeBand::Low)
    } else if ratio < cuts.high_start {
        Some(IncomeBand::Middle)
    } else {
        Some(IncomeBand::High)
    }
}

/// Codes for the diabetes questionnaire item, already normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiabetesCodes {
    pub diagnosed: String,
    pub not_diagnosed: String,
    pub borderline: String,
}

pub fn diabetes_status(code: Option<&str>, codes: &DiabetesCodes) -> Option<DiabetesStatus> {
    let code = code?;
    if code == codes.diagnosed {
        Some(DiabetesStatus::Diagnosed)
    } else if code == codes.not_diagnosed {
        Some(DiabetesStatus::NotDiagnosed)
    } else if code == codes.borderline {
        Some(DiabetesStatus::Borderline)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_model::AnalysisConfig;

    #[test]
    fn race_lookup_is_data() {
        let lookup = AnalysisConfig::default().race_lookup;
        assert_eq!(race_ethnicity(Some("1"), &lookup), Some(RaceEthnicity::Hispanic));
        assert_eq!(race_ethnicity(Some("2"), &lookup), Some(RaceEthnicity::Hispanic));
        assert_eq!(
            race_ethnicity(Some("6"), &lookup),
            Some(RaceEthnicity::NonHispanicAsian)
        );
        assert_eq!(race_ethnicity(Some("5"), &lookup), None);
        assert_eq!(race_ethnicity(None, &lookup), None);
    }

    #[test]
    fn age_band_edges() {
        let cuts = AgeCutPoints::default();
        assert_eq!(age_band(Some(17.9), &cuts), None);
        assert_eq!(age_band(Some(18.0), &cuts), Some(AgeBand::YoungAdult));
        assert_eq!(age_band(Some(39.0), &cuts), Some(AgeBand::YoungAdult));
        assert_eq!(age_band(Some(40.0), &cuts), Some(AgeBand::MiddleAge));
        assert_eq!(age_band(Some(60.0), &cuts), Some(AgeBand::OlderAdult));
        assert_eq!(age_band(Some(80.0), &cuts), Some(AgeBand::OlderAdult));
        assert_eq!(age_band(None, &cuts), None);
    }

    #[test]
    fn income_band_edges() {
        let cuts = IncomeCutPoints::default();
        assert_eq!(income_band(Some(0.0), &cuts), Some(IncomeBand::Low));
        assert_eq!(income_band(Some(1.29), &cuts), Some(IncomeBand::Low));
        assert_eq!(income_band(Some(1.3), &cuts), Some(IncomeBand::Middle));
        assert_eq!(income_band(Some(3.5), &cuts), Some(IncomeBand::High));
        assert_eq!(income_band(Some(5.0), &cuts), Some(IncomeBand::High));
        assert_eq!(income_band(Some(-1.0), &cuts), None);
    }

    #[test]
    fn diabetes_codes() {
        let codes = DiabetesCodes {
            diagnosed: "1".to_string(),
            not_diagnosed: "2".to_string(),
            borderline: "3".to_string(),
        };
        assert_eq!(diabetes_status(Some("1"), &codes), Some(DiabetesStatus::Diagnosed));
        assert_eq!(diabetes_status(Some("2"), &codes), Some(DiabetesStatus::NotDiagnosed));
        assert_eq!(diabetes_status(Some("3"), &codes), Some(DiabetesStatus::Borderline));
        assert_eq!(diabetes_status(Some("9"), &codes), None);
    }
}
