#![deny(unsafe_code)]

use std::cmp::Ordering;
use std::fmt;

use survey_common::{natural_cmp, normalize_code};

/// Respondent identifier shared by every survey module.
///
/// Integer and string identifiers are both accepted; numeric text is
/// canonicalized so `93703`, `"93703"` and `93703.0` join as the same subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SubjectId(String);

impl SubjectId {
    /// Builds an identifier from raw text, returning `None` for blank input.
    pub fn parse(raw: &str) -> Option<Self> {
        normalize_code(raw).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Ord for SubjectId {
    fn cmp(&self, other: &Self) -> Ordering {
        natural_cmp(&self.0, &other.0)
    }
}

impl PartialOrd for SubjectId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
