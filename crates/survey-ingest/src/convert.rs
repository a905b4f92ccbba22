//! DataFrame to `ModuleTable` conversion.
//!
//! Sentinel codes are remapped to `Value::Missing` here, once, so that no
//! later stage has to know which raw values mean "not measured".

use std::collections::BTreeMap;

use polars::prelude::*;
use survey_common::{any_to_f64, any_to_string};
use survey_model::{ModuleQuality, ModuleTable, Row, Value};

use crate::error::Result;

/// Converts a single cell. Blank text and non-finite numbers are missing.
pub fn cell_value(value: AnyValue<'_>) -> Value {
    match value {
        AnyValue::Null => Value::Missing,
        AnyValue::String(_) | AnyValue::StringOwned(_) | AnyValue::Boolean(_) => {
            let text = any_to_string(value);
            if text.is_empty() {
                Value::Missing
            } else {
                Value::Text(text)
            }
        }
        other => any_to_f64(other).map_or(Value::Missing, Value::Number),
    }
}

/// Builds a module table from a frame, remapping sentinel values per column.
///
/// Returns the table together with its quality summary.
pub fn frame_to_table(
    module: &str,
    df: &DataFrame,
    sentinels: &BTreeMap<String, Vec<f64>>,
) -> Result<(ModuleTable, ModuleQuality)> {
    let columns: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();
    let mut table = ModuleTable::new(module, columns.clone());

    let frame_columns = df.get_columns();
    for row_idx in 0..df.height() {
        let mut row = Row::new();
        for (name, column) in columns.iter().zip(frame_columns) {
            row.insert(name.clone(), cell_value(column.get(row_idx)?));
        }
        table.push_row(row);
    }

    let sentinel_replacements = table.remap_sentinels(sentinels);
    let quality = ModuleQuality {
        module: module.to_string(),
        rows: table.rows.len(),
        columns: columns.len(),
        missing_by_column: table.missing_counts(),
        sentinel_replacements,
    };

    if quality.total_replacements() > 0 {
        tracing::info!(
            module,
            replaced = quality.total_replacements(),
            "remapped sentinel values to missing"
        );
    }
    Ok((table, quality))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_df(columns: Vec<(&str, Vec<Option<f64>>)>) -> DataFrame {
        let cols: Vec<Column> = columns
            .into_iter()
            .map(|(name, values)| Series::new(name.into(), values).into_column())
            .collect();
        DataFrame::new(cols).unwrap()
    }

    #[test]
    fn remaps_diastolic_zero() {
        let df = test_df(vec![
            ("SEQN", vec![Some(1.0), Some(2.0), Some(3.0)]),
            ("BPXDI1", vec![Some(0.0), Some(78.0), None]),
            ("BPXSY1", vec![Some(0.0), Some(120.0), Some(118.0)]),
        ]);
        let sentinels = BTreeMap::from([("BPXDI1".to_string(), vec![0.0])]);
        let (table, quality) = frame_to_table("BPX", &df, &sentinels).unwrap();

        assert!(table.rows[0]["BPXDI1"].is_missing());
        assert_eq!(table.rows[1]["BPXDI1"], Value::Number(78.0));
        // Systolic zero is not a configured sentinel.
        assert_eq!(table.rows[0]["BPXSY1"], Value::Number(0.0));

        assert_eq!(quality.rows, 3);
        assert_eq!(quality.sentinel_replacements.get("BPXDI1"), Some(&1));
        assert_eq!(quality.missing_by_column.get("BPXDI1"), Some(&2));
        assert_eq!(quality.missing_by_column.get("BPXSY1"), Some(&0));
    }

    #[test]
    fn blank_text_is_missing() {
        assert!(cell_value(AnyValue::String("   ")).is_missing());
        assert_eq!(
            cell_value(AnyValue::String(" 93703 ")),
            Value::Text("93703".to_string())
        );
        assert!(cell_value(AnyValue::Float64(f64::NAN)).is_missing());
        assert_eq!(cell_value(AnyValue::Int64(4)), Value::Number(4.0));
    }
}
