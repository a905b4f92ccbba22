//! Blood-pressure derivations: replicate means, hypertension, severity.

use survey_model::{BpThresholds, HypertensionStatus, SeverityBand};

/// Mean of the non-missing readings; `None` when there are none.
pub fn replicate_mean<I>(readings: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let (sum, count) = readings
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Hypertension indicator.
///
/// Any positive criterion wins, even when the other inputs are missing.
/// `Negative` needs both means; otherwise the status is `Indeterminate`.
pub fn hypertension_status(
    systolic: Option<f64>,
    diastolic: Option<f64>,
    told_high_bp: Option<bool>,
    on_medication: Option<bool>,
    thresholds: &BpThresholds,
) -> HypertensionStatus {
    let high_systolic = systolic.is_some_and(|v| v >= thresholds.systolic.stage1);
    let high_diastolic = diastolic.is_some_and(|v| v >= thresholds.diastolic.stage1);
    if high_systolic
        || high_diastolic
        || told_high_bp == Some(true)
        || on_medication == Some(true)
    {
        HypertensionStatus::Positive
    } else if systolic.is_some() && diastolic.is_some() {
        HypertensionStatus::Negative
    } else {
        HypertensionStatus::Indeterminate
    }
}

/// Severity band, evaluated from the highest band down.
///
/// Each band is a pair of independent lower-bound predicates joined by OR;
/// the first band that matches either reading is assigned. Both means are
/// required.
pub fn severity_band(
    systolic: Option<f64>,
    diastolic: Option<f64>,
    thresholds: &BpThresholds,
) -> Option<SeverityBand> {
    let (sys, dia) = (systolic?, diastolic?);
    let (s, d) = (&thresholds.systolic, &thresholds.diastolic);

    let band = if sys > s.crisis || dia > d.crisis {
        SeverityBand::Crisis
    } else if sys >= s.stage2 || dia >= d.stage2 {
        SeverityBand::Stage2
    } else if sys >= s.stage1 || dia >= d.stage1 {
        SeverityBand::Elevated
    } else {
        SeverityBand::Normal
    };
    Some(band)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t() -> BpThresholds {
        BpThresholds::default()
    }

    #[test]
    fn mean_skips_missing_readings() {
        assert_eq!(replicate_mean([Some(132.0), Some(128.0), None]), Some(130.0));
        assert_eq!(replicate_mean([None, Some(78.0), Some(82.0)]), Some(80.0));
        assert_eq!(replicate_mean([None, None, None]), None);
        assert_eq!(replicate_mean(Vec::new()), None);
    }

    #[test]
    fn positive_criteria() {
        let th = t();
        assert_eq!(
            hypertension_status(Some(130.0), Some(70.0), None, None, &th),
            HypertensionStatus::Positive
        );
        assert_eq!(
            hypertension_status(Some(120.0), Some(80.0), None, None, &th),
            HypertensionStatus::Positive
        );
        // Self-report alone is enough, even without any reading.
        assert_eq!(
            hypertension_status(None, None, Some(true), None, &th),
            HypertensionStatus::Positive
        );
        assert_eq!(
            hypertension_status(None, None, Some(false), Some(true), &th),
            HypertensionStatus::Positive
        );
    }

    #[test]
    fn negative_needs_both_means() {
        let th = t();
        assert_eq!(
            hypertension_status(Some(118.0), Some(76.0), Some(false), Some(false), &th),
            HypertensionStatus::Negative
        );
        assert_eq!(
            hypertension_status(Some(118.0), None, Some(false), None, &th),
            HypertensionStatus::Indeterminate
        );
        assert_eq!(
            hypertension_status(None, None, None, None, &th),
            HypertensionStatus::Indeterminate
        );
    }

    #[test]
    fn severity_boundaries() {
        let th = t();
        let band = |s, d| severity_band(Some(s), Some(d), &th);
        assert_eq!(band(129.9, 79.9), Some(SeverityBand::Normal));
        assert_eq!(band(130.0, 60.0), Some(SeverityBand::Elevated));
        assert_eq!(band(110.0, 80.0), Some(SeverityBand::Elevated));
        assert_eq!(band(140.0, 60.0), Some(SeverityBand::Stage2));
        assert_eq!(band(120.0, 90.0), Some(SeverityBand::Stage2));
        // The crisis bound is strict, so exactly 180/120 stays in stage 2.
        assert_eq!(band(180.0, 120.0), Some(SeverityBand::Stage2));
        assert_eq!(band(180.5, 70.0), Some(SeverityBand::Crisis));
        assert_eq!(band(110.0, 121.0), Some(SeverityBand::Crisis));
        // Highest matching band wins across axes.
        assert_eq!(band(135.0, 95.0), Some(SeverityBand::Stage2));
    }

    #[test]
    fn severity_needs_both_means() {
        assert_eq!(severity_band(Some(190.0), None, &t()), None);
        assert_eq!(severity_band(None, Some(70.0), &t()), None);
    }

    #[test]
    fn scenario_mixed_replicates() {
        let sys = replicate_mean([Some(132.0), Some(128.0), None]);
        let dia = replicate_mean([None, Some(78.0), Some(82.0)]);
        assert_eq!(sys, Some(130.0));
        assert_eq!(dia, Some(80.0));
        assert_eq!(
            hypertension_status(sys, dia, None, None, &t()),
            HypertensionStatus::Positive
        );
        assert_eq!(severity_band(sys, dia, &t()), Some(SeverityBand::Elevated));
    }

    fn matches_band(band: SeverityBand, sys: f64, dia: f64, th: &BpThresholds) -> bool {
        let (s, d) = (&th.systolic, &th.diastolic);
        match band {
            SeverityBand::Crisis => sys > s.crisis || dia > d.crisis,
            SeverityBand::Stage2 => {
                !(sys > s.crisis || dia > d.crisis) && (sys >= s.stage2 || dia >= d.stage2)
            }
            SeverityBand::Elevated => {
                sys < s.stage2 && dia < d.stage2 && (sys >= s.stage1 || dia >= d.stage1)
            }
            SeverityBand::Normal => sys < s.stage1 && dia < d.stage1,
        }
    }

    proptest! {
        #[test]
        fn exactly_one_band_matches(sys in 40.0f64..260.0, dia in 20.0f64..160.0) {
            let th = t();
            let matching: Vec<SeverityBand> = [
                SeverityBand::Normal,
                SeverityBand::Elevated,
                SeverityBand::Stage2,
                SeverityBand::Crisis,
            ]
            .into_iter()
            .filter(|band| matches_band(*band, sys, dia, &th))
            .collect();
            prop_assert_eq!(matching.len(), 1);
            prop_assert_eq!(severity_band(Some(sys), Some(dia), &th), Some(matching[0]));
        }

        #[test]
        fn negative_implies_both_means(
            sys in proptest::option::of(60.0f64..220.0),
            dia in proptest::option::of(30.0f64..140.0),
            told in proptest::option::of(any::<bool>()),
            meds in proptest::option::of(any::<bool>()),
        ) {
            let status = hypertension_status(sys, dia, told, meds, &t());
            if status == HypertensionStatus::Negative {
                prop_assert!(sys.is_some() && dia.is_some());
            }
        }
    }
}
