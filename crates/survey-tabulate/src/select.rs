//! Field selection: reading a record's category for a selector.

use std::collections::{BTreeMap, BTreeSet};

use survey_model::{Category, Dataset, FieldSelector, SubjectRecord};

use crate::error::{Result, TabulationError};

/// Code-to-label maps for raw columns, keyed by column name.
pub type ValueLabels = BTreeMap<String, BTreeMap<String, String>>;

/// Category of `record` for `selector`. Unset values map to `Missing`.
pub fn category_of(record: &SubjectRecord, selector: &FieldSelector, labels: &ValueLabels) -> Category {
    match selector {
        FieldSelector::Derived(field) => record.derived_category(*field),
        FieldSelector::Column(column) => match record.code(column) {
            Some(code) => {
                let label = labels
                    .get(column)
                    .and_then(|map| map.get(&code))
                    .cloned()
                    .unwrap_or_else(|| code.clone());
                Category::raw(code, label)
            }
            None => Category::Missing,
        },
    }
}

/// Raw columns must exist in at least one record; derived fields always exist.
pub fn check_field(dataset: &Dataset, selector: &FieldSelector) -> Result<()> {
    match selector {
        FieldSelector::Derived(_) => Ok(()),
        FieldSelector::Column(column) => {
            if has_column(dataset, column) {
                Ok(())
            } else {
                Err(TabulationError::UnknownField {
                    field: column.clone(),
                })
            }
        }
    }
}

pub fn has_column(dataset: &Dataset, column: &str) -> bool {
    dataset
        .records
        .iter()
        .any(|record| record.fields.contains_key(column))
}

/// Levels a stratifying field iterates over.
///
/// Derived fields use every declared level, so an empty stratum is still
/// reported; raw columns use the levels observed in the data. `Missing` is
/// included only when some record has it.
pub fn stratum_levels(
    dataset: &Dataset,
    selector: &FieldSelector,
    labels: &ValueLabels,
) -> Vec<Category> {
    let observed: BTreeSet<Category> = dataset
        .records
        .iter()
        .map(|record| category_of(record, selector, labels))
        .collect();

    match selector {
        FieldSelector::Derived(field) => {
            let mut levels = field.levels();
            if observed.contains(&Category::Missing) {
                levels.push(Category::Missing);
            }
            levels
        }
        FieldSelector::Column(_) => observed.into_iter().collect(),
    }
}
