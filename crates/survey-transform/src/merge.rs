//! Full outer join of module tables on the subject identifier.

use std::collections::BTreeMap;

use survey_model::{Dataset, MergeSummary, ModuleTable, SubjectId, SubjectRecord, Value};
use tracing::{debug, info, info_span, warn};

use crate::error::MergeError;

/// Result of a successful merge.
#[derive(Debug, Clone)]
pub struct MergeOutput {
    pub dataset: Dataset,
    pub summary: MergeSummary,
}

/// Joins every table on `id_column`, producing one record per subject ID.
///
/// Subjects absent from a module get `Missing` for each of its columns and
/// list the module in `missing_modules`. Modules named in `excluded` were
/// dropped before the merge, so every subject lists them as missing. Rows with
/// a blank identifier cannot be joined and are counted in the summary instead.
pub fn merge_modules(
    tables: &[ModuleTable],
    excluded: &[String],
    id_column: &str,
) -> Result<MergeOutput, MergeError> {
    let span = info_span!("merge", modules = tables.len());
    let _guard = span.enter();

    check_schema(tables, id_column)?;

    let mut records: BTreeMap<SubjectId, SubjectRecord> = BTreeMap::new();
    let mut summary = MergeSummary::default();

    for table in tables {
        let (keyed, blank) = key_rows(table, id_column)?;
        if blank > 0 {
            warn!(module = %table.name, rows = blank, "skipped rows with blank identifier");
            summary.blank_ids_by_module.insert(table.name.clone(), blank);
        }
        summary
            .rows_by_module
            .insert(table.name.clone(), keyed.len());

        for (id, row_idx) in keyed {
            let record = records
                .entry(id.clone())
                .or_insert_with(|| SubjectRecord::new(id));
            for (column, value) in &table.rows[row_idx] {
                if column != id_column {
                    record.fields.insert(column.clone(), value.clone());
                }
            }
            record.modules.insert(table.name.clone());
        }
        debug!(module = %table.name, subjects = records.len(), "joined module");
    }

    let module_names: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();
    for record in records.values_mut() {
        record
            .fields
            .insert(id_column.to_string(), Value::Text(record.id.to_string()));
        record.missing_modules.extend(excluded.iter().cloned());
        for table in tables {
            if record.modules.contains(&table.name) {
                continue;
            }
            record.missing_modules.insert(table.name.clone());
            for column in table.columns.iter().filter(|c| *c != id_column) {
                record
                    .fields
                    .entry(column.clone())
                    .or_insert(Value::Missing);
            }
        }
    }

    summary.subjects = records.len();
    for name in &module_names {
        let present = summary.rows_by_module.get(name).copied().unwrap_or(0);
        summary
            .missing_by_module
            .insert(name.clone(), summary.subjects - present);
    }
    for name in excluded {
        summary.missing_by_module.insert(name.clone(), summary.subjects);
    }

    info!(subjects = summary.subjects, "merged modules");
    Ok(MergeOutput {
        dataset: Dataset {
            modules: module_names,
            records: records.into_values().collect(),
        },
        summary,
    })
}

/// Every table must carry the identifier, and no other column may appear twice.
fn check_schema(tables: &[ModuleTable], id_column: &str) -> Result<(), MergeError> {
    let mut owners: BTreeMap<&str, &str> = BTreeMap::new();
    for table in tables {
        if !table.has_column(id_column) {
            return Err(MergeError::Schema {
                module: table.name.clone(),
                column: id_column.to_string(),
            });
        }
        for column in table.columns.iter().filter(|c| *c != id_column) {
            if let Some(first) = owners.insert(column.as_str(), table.name.as_str()) {
                return Err(MergeError::ColumnConflict {
                    column: column.clone(),
                    first: first.to_string(),
                    second: table.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Maps each subject to its row index, rejecting repeated IDs.
///
/// Returns the keyed rows and the number of rows with a blank identifier.
fn key_rows(
    table: &ModuleTable,
    id_column: &str,
) -> Result<(BTreeMap<SubjectId, usize>, usize), MergeError> {
    let mut keyed = BTreeMap::new();
    let mut counts: BTreeMap<SubjectId, usize> = BTreeMap::new();
    let mut blank = 0usize;

    for (row_idx, row) in table.rows.iter().enumerate() {
        let Some(id) = row
            .get(id_column)
            .and_then(Value::as_code)
            .and_then(|code| SubjectId::parse(&code))
        else {
            blank += 1;
            continue;
        };
        *counts.entry(id.clone()).or_default() += 1;
        keyed.entry(id).or_insert(row_idx);
    }

    let duplicates: Vec<(SubjectId, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect();
    if !duplicates.is_empty() {
        return Err(MergeError::DuplicateKey {
            module: table.name.clone(),
            duplicates,
        });
    }
    Ok((keyed, blank))
}
