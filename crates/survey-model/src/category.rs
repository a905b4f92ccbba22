//! Derived categorical variables and the category values used in tabulations.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};
use survey_common::natural_cmp;

/// Label used for the missing pseudo-category in every rendered table.
pub const MISSING_LABEL: &str = "Missing";

/// A value of a categorical dimension.
///
/// `Missing` is a first-class category: records whose field cannot be
/// determined are grouped here instead of being dropped. It always sorts last.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Category {
    Level {
        /// Declared position for ordinal/nominal derived levels.
        rank: Option<u32>,
        code: String,
        label: String,
    },
    Missing,
}

impl Category {
    pub fn ranked(rank: u32, code: &str, label: &str) -> Self {
        Self::Level {
            rank: Some(rank),
            code: code.to_string(),
            label: label.to_string(),
        }
    }

    pub fn raw(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self::Level {
            rank: None,
            code: code.into(),
            label: label.into(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Level { label, .. } => label,
            Self::Missing => MISSING_LABEL,
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Level { code, .. } => Some(code),
            Self::Missing => None,
        }
    }
}

/// Ranked levels come first in declared order, then raw codes in natural
/// order, then `Missing`. Labels break remaining ties so `Ord` agrees with `Eq`.
impl Ord for Category {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Missing, Self::Missing) => Ordering::Equal,
            (Self::Missing, Self::Level { .. }) => Ordering::Greater,
            (Self::Level { .. }, Self::Missing) => Ordering::Less,
            (
                Self::Level {
                    rank: left_rank,
                    code: left_code,
                    label: left_label,
                },
                Self::Level {
                    rank: right_rank,
                    code: right_code,
                    label: right_label,
                },
            ) => {
                let by_position = match (left_rank, right_rank) {
                    (Some(a), Some(b)) => a.cmp(b),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                };
                by_position
                    .then_with(|| natural_cmp(left_code, right_code))
                    .then_with(|| left_label.cmp(right_label))
            }
        }
    }
}

impl PartialOrd for Category {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Common behaviour of the enumerated derived variables.
pub trait DerivedLevel: Copy + 'static {
    /// Every level in declared order.
    const ALL: &'static [Self];

    fn rank(self) -> u32;
    fn code(self) -> &'static str;
    fn label(self) -> &'static str;

    fn to_category(self) -> Category {
        Category::ranked(self.rank(), self.code(), self.label())
    }
}

/// Binary hypertension indicator with an explicit undecidable state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypertensionStatus {
    Negative,
    Positive,
    /// Neither a positive criterion nor both pressure means were available.
    #[default]
    Indeterminate,
}

impl DerivedLevel for HypertensionStatus {
    const ALL: &'static [Self] = &[Self::Negative, Self::Positive, Self::Indeterminate];

    fn rank(self) -> u32 {
        self as u32
    }

    fn code(self) -> &'static str {
        match self {
            Self::Negative => "negative",
            Self::Positive => "positive",
            Self::Indeterminate => "indeterminate",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Negative => "No hypertension",
            Self::Positive => "Hypertension",
            Self::Indeterminate => "Indeterminate",
        }
    }
}

/// Ordinal blood-pressure severity, 0 through 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    Normal = 0,
    Elevated = 1,
    Stage2 = 2,
    Crisis = 3,
}

impl SeverityBand {
    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl DerivedLevel for SeverityBand {
    const ALL: &'static [Self] = &[Self::Normal, Self::Elevated, Self::Stage2, Self::Crisis];

    fn rank(self) -> u32 {
        self as u32
    }

    fn code(self) -> &'static str {
        match self {
            Self::Normal => "0",
            Self::Elevated => "1",
            Self::Stage2 => "2",
            Self::Crisis => "3",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Normal => "0 Normal",
            Self::Elevated => "1 Elevated / stage 1",
            Self::Stage2 => "2 Stage 2",
            Self::Crisis => "3 Crisis",
        }
    }
}

/// Collapsed race/Hispanic-origin bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceEthnicity {
    Hispanic,
    NonHispanicWhite,
    NonHispanicBlack,
    NonHispanicAsian,
    NonHispanicOther,
}

impl DerivedLevel for RaceEthnicity {
    const ALL: &'static [Self] = &[
        Self::Hispanic,
        Self::NonHispanicWhite,
        Self::NonHispanicBlack,
        Self::NonHispanicAsian,
        Self::NonHispanicOther,
    ];

    fn rank(self) -> u32 {
        self as u32
    }

    fn code(self) -> &'static str {
        match self {
            Self::Hispanic => "hispanic",
            Self::NonHispanicWhite => "non_hispanic_white",
            Self::NonHispanicBlack => "non_hispanic_black",
            Self::NonHispanicAsian => "non_hispanic_asian",
            Self::NonHispanicOther => "non_hispanic_other",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Hispanic => "Hispanic",
            Self::NonHispanicWhite => "Non-Hispanic White",
            Self::NonHispanicBlack => "Non-Hispanic Black",
            Self::NonHispanicAsian => "Non-Hispanic Asian",
            Self::NonHispanicOther => "Non-Hispanic Other/Multiple",
        }
    }
}

/// Adult age band; respondents under the adult minimum have no band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeBand {
    YoungAdult,
    MiddleAge,
    OlderAdult,
}

impl DerivedLevel for AgeBand {
    const ALL: &'static [Self] = &[Self::YoungAdult, Self::MiddleAge, Self::OlderAdult];

    fn rank(self) -> u32 {
        self as u32
    }

    fn code(self) -> &'static str {
        match self {
            Self::YoungAdult => "young_adult",
            Self::MiddleAge => "middle_age",
            Self::OlderAdult => "older_adult",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::YoungAdult => "Young adult",
            Self::MiddleAge => "Middle age",
            Self::OlderAdult => "Older adult",
        }
    }
}

/// Family income band from the poverty-income ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncomeBand {
    Low,
    Middle,
    High,
}

impl DerivedLevel for IncomeBand {
    const ALL: &'static [Self] = &[Self::Low, Self::Middle, Self::High];

    fn rank(self) -> u32 {
        self as u32
    }

    fn code(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Middle => "middle",
            Self::High => "high",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Low => "Low income",
            Self::Middle => "Middle income",
            Self::High => "High income",
        }
    }
}

/// Self-reported diabetes history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiabetesStatus {
    NotDiagnosed,
    Borderline,
    Diagnosed,
}

impl DerivedLevel for DiabetesStatus {
    const ALL: &'static [Self] = &[Self::NotDiagnosed, Self::Borderline, Self::Diagnosed];

    fn rank(self) -> u32 {
        self as u32
    }

    fn code(self) -> &'static str {
        match self {
            Self::NotDiagnosed => "not_diagnosed",
            Self::Borderline => "borderline",
            Self::Diagnosed => "diagnosed",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::NotDiagnosed => "No diabetes",
            Self::Borderline => "Borderline",
            Self::Diagnosed => "Diabetes",
        }
    }
}

/// Names of the derived categorical fields a tabulation may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedField {
    Hypertension,
    HypertensionSeverity,
    RaceEthnicity,
    AgeBand,
    IncomeBand,
    DiabetesStatus,
}

impl DerivedField {
    pub const ALL: &'static [Self] = &[
        Self::Hypertension,
        Self::HypertensionSeverity,
        Self::RaceEthnicity,
        Self::AgeBand,
        Self::IncomeBand,
        Self::DiabetesStatus,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Hypertension => "hypertension",
            Self::HypertensionSeverity => "hypertension_severity",
            Self::RaceEthnicity => "race_ethnicity",
            Self::AgeBand => "age_band",
            Self::IncomeBand => "income_band",
            Self::DiabetesStatus => "diabetes_status",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Hypertension => "Hypertension indicator (negative / positive / indeterminate)",
            Self::HypertensionSeverity => "Blood-pressure severity band 0-3",
            Self::RaceEthnicity => "Collapsed race/Hispanic origin, 5 levels",
            Self::AgeBand => "Adult age band, 3 levels",
            Self::IncomeBand => "Poverty-income ratio band, 3 levels",
            Self::DiabetesStatus => "Self-reported diabetes history",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|field| field.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Every declared level of the field, excluding the missing pseudo-category.
    pub fn levels(self) -> Vec<Category> {
        match self {
            Self::Hypertension => categories::<HypertensionStatus>(),
            Self::HypertensionSeverity => categories::<SeverityBand>(),
            Self::RaceEthnicity => categories::<RaceEthnicity>(),
            Self::AgeBand => categories::<AgeBand>(),
            Self::IncomeBand => categories::<IncomeBand>(),
            Self::DiabetesStatus => categories::<DiabetesStatus>(),
        }
    }
}

fn categories<T: DerivedLevel>() -> Vec<Category> {
    T::ALL.iter().map(|level| level.to_category()).collect()
}

impl fmt::Display for DerivedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Selects the categorical variable for one tabulation dimension.
///
/// Derived field names take precedence; anything else names a raw module column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldSelector {
    Derived(DerivedField),
    Column(String),
}

impl FieldSelector {
    pub fn parse(name: &str) -> Self {
        match DerivedField::from_name(name) {
            Some(field) => Self::Derived(field),
            None => Self::Column(name.trim().to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Derived(field) => field.name(),
            Self::Column(column) => column,
        }
    }
}

impl From<String> for FieldSelector {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<FieldSelector> for String {
    fn from(value: FieldSelector) -> Self {
        value.name().to_string()
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sorts_last() {
        let mut levels = vec![
            Category::Missing,
            SeverityBand::Crisis.to_category(),
            SeverityBand::Normal.to_category(),
        ];
        levels.sort();
        assert_eq!(levels[0], SeverityBand::Normal.to_category());
        assert!(levels[2].is_missing());
    }

    #[test]
    fn raw_levels_sort_numerically() {
        let mut levels = vec![Category::raw("10", "10"), Category::raw("2", "2")];
        levels.sort();
        assert_eq!(levels[0].code(), Some("2"));
    }

    #[test]
    fn ordering_agrees_with_equality() {
        let coded = Category::raw("7", "Other");
        let relabelled = Category::raw("7", "7");
        assert_ne!(coded, relabelled);
        assert_ne!(coded.cmp(&relabelled), Ordering::Equal);
        assert_eq!(coded.cmp(&coded.clone()), Ordering::Equal);

        let levels: std::collections::BTreeSet<Category> =
            [coded, relabelled].into_iter().collect();
        assert_eq!(levels.len(), 2);
    }

    #[test]
    fn selector_prefers_derived_names() {
        assert_eq!(
            FieldSelector::parse("age_band"),
            FieldSelector::Derived(DerivedField::AgeBand)
        );
        assert_eq!(
            FieldSelector::parse("OCQ670"),
            FieldSelector::Column("OCQ670".to_string())
        );
    }

    #[test]
    fn severity_levels_are_ordinal() {
        let ordinals: Vec<u8> = SeverityBand::ALL.iter().map(|b| b.ordinal()).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
    }
}
