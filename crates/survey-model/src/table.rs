#![deny(unsafe_code)]

use std::collections::BTreeMap;

/// A single module field after ingestion.
///
/// Sentinel codes have already been mapped to `Missing` by the loader, so
/// downstream code never inspects raw sentinel values.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Numeric view of the value; numeric text is parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(text) => survey_common::parse_f64(text).filter(|v| v.is_finite()),
            Self::Missing => None,
        }
    }

    /// Normalized code view of the value, used for categorical lookups.
    pub fn as_code(&self) -> Option<String> {
        match self {
            Self::Number(v) => Some(survey_common::format_numeric(*v)),
            Self::Text(text) => survey_common::normalize_code(text),
            Self::Missing => None,
        }
    }
}

/// One record of a module table: column name to value.
pub type Row = BTreeMap<String, Value>;

/// A record-oriented survey module as delivered by the loader.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ModuleTable {
    /// Module code, e.g. `DEMO` or `BPX`.
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl ModuleTable {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Replace sentinel values with `Missing`, returning replacements per column.
    ///
    /// Text cells are compared numerically, so `"0"` matches a `0` sentinel.
    pub fn remap_sentinels(
        &mut self,
        sentinels: &BTreeMap<String, Vec<f64>>,
    ) -> BTreeMap<String, usize> {
        let mut replaced = BTreeMap::new();
        for row in &mut self.rows {
            for (column, codes) in sentinels {
                let Some(value) = row.get_mut(column) else {
                    continue;
                };
                let hit = value
                    .as_f64()
                    .is_some_and(|number| codes.iter().any(|code| *code == number));
                if hit {
                    *value = Value::Missing;
                    *replaced.entry(column.clone()).or_insert(0) += 1;
                }
            }
        }
        replaced
    }

    /// Missing cells per column.
    pub fn missing_counts(&self) -> BTreeMap<String, usize> {
        self.columns
            .iter()
            .map(|column| {
                let missing = self
                    .rows
                    .iter()
                    .filter(|row| row.get(column).is_none_or(Value::is_missing))
                    .count();
                (column.clone(), missing)
            })
            .collect()
    }
}
