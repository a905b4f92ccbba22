//! Weighted tabulation engine.
//!
//! The engine reads an immutable, already derived dataset. Each request is
//! computed independently; a failed request (or stratum) becomes a
//! `TableOutcome::Skipped` entry and the batch continues.

use std::collections::{BTreeMap, BTreeSet};

use survey_model::{
    AnalysisConfig, Category, ChiSquareScale, ChiSquareTest, Dataset, Dimension, Exclusions,
    StratumLevel, SubjectRecord, TableOutcome, TabulationRequest, TabulationResult,
    TabulationSettings, WeightedCount,
};
use tracing::{debug, info, info_span, warn};

use crate::chi_square::{ContingencyTable, pearson};
use crate::error::{Result, TabulationError};
use crate::select::{ValueLabels, category_of, check_field, has_column, stratum_levels};

/// Running totals for one cell.
#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    weight: f64,
    records: usize,
}

/// Computes weighted tables over a dataset.
#[derive(Debug, Clone, Default)]
pub struct TabulationEngine {
    settings: TabulationSettings,
    labels: ValueLabels,
}

impl TabulationEngine {
    pub fn new(settings: TabulationSettings, labels: ValueLabels) -> Self {
        Self { settings, labels }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.tabulation, config.value_labels.clone())
    }

    pub fn settings(&self) -> &TabulationSettings {
        &self.settings
    }

    /// Runs every request, expanding stratified requests into one outcome per stratum.
    pub fn run_batch(&self, dataset: &Dataset, requests: &[TabulationRequest]) -> Vec<TableOutcome> {
        let span = info_span!("tabulate", tables = requests.len());
        let _guard = span.enter();

        let outcomes: Vec<TableOutcome> = requests
            .iter()
            .flat_map(|request| self.run(dataset, request))
            .collect();
        let skipped = outcomes.iter().filter(|o| o.is_skipped()).count();
        info!(
            outcomes = outcomes.len(),
            skipped, "finished tabulation batch"
        );
        outcomes
    }

    /// Runs one request. Stratified requests yield one outcome per stratum level.
    pub fn run(&self, dataset: &Dataset, request: &TabulationRequest) -> Vec<TableOutcome> {
        if let Err(err) = self.check_request(dataset, request) {
            warn!(table = %request.name, error = %err, "table skipped");
            return vec![skipped(request, None, &err)];
        }

        let Some(stratum) = &request.stratum else {
            let records: Vec<&SubjectRecord> = dataset.records.iter().collect();
            return vec![self.outcome(request, &records, None)];
        };

        stratum_levels(dataset, stratum, &self.labels)
            .into_iter()
            .map(|level| {
                let records: Vec<&SubjectRecord> = dataset
                    .records
                    .iter()
                    .filter(|record| category_of(record, stratum, &self.labels) == level)
                    .collect();
                let stratum_level = StratumLevel {
                    field: stratum.name().to_string(),
                    level,
                };
                self.outcome(request, &records, Some(stratum_level))
            })
            .collect()
    }

    fn check_request(&self, dataset: &Dataset, request: &TabulationRequest) -> Result<()> {
        check_field(dataset, &request.rows)?;
        if let Some(columns) = &request.columns {
            check_field(dataset, columns)?;
        }
        if let Some(stratum) = &request.stratum {
            check_field(dataset, stratum)?;
        }
        if !has_column(dataset, &request.weight) {
            return Err(TabulationError::UnknownWeight {
                column: request.weight.clone(),
            });
        }
        Ok(())
    }

    fn outcome(
        &self,
        request: &TabulationRequest,
        records: &[&SubjectRecord],
        stratum: Option<StratumLevel>,
    ) -> TableOutcome {
        match self.tabulate(request, records, stratum.clone()) {
            Ok(result) => {
                if result.test.is_some_and(|test| test.low_expected_warning) {
                    warn!(
                        table = %request.name,
                        stratum = stratum.as_ref().map(|s| s.level.label()),
                        "more cells than allowed have small expected counts"
                    );
                }
                TableOutcome::Computed(result)
            }
            Err(err) => {
                warn!(
                    table = %request.name,
                    stratum = stratum.as_ref().map(|s| s.level.label()),
                    error = %err,
                    "table skipped"
                );
                skipped(request, stratum, &err)
            }
        }
    }

    /// Tabulates the given records. Stratification has already been applied.
    pub fn tabulate(
        &self,
        request: &TabulationRequest,
        records: &[&SubjectRecord],
        stratum: Option<StratumLevel>,
    ) -> Result<TabulationResult> {
        let mut excluded = Exclusions::default();
        let mut cells: BTreeMap<(Category, Option<Category>), Cell> = BTreeMap::new();
        let mut row_levels = BTreeSet::new();
        let mut column_levels = BTreeSet::new();

        for record in records {
            let weight = match record.number(&request.weight) {
                None => {
                    excluded.missing_weight += 1;
                    continue;
                }
                Some(w) if w < 0.0 => {
                    excluded.negative_weight += 1;
                    continue;
                }
                Some(w) => w,
            };

            let row = category_of(record, &request.rows, &self.labels);
            let column = request
                .columns
                .as_ref()
                .map(|selector| category_of(record, selector, &self.labels));
            let any_missing = row.is_missing() || column.as_ref().is_some_and(Category::is_missing);
            if request.drop_missing && any_missing {
                excluded.missing_category += 1;
                continue;
            }

            row_levels.insert(row.clone());
            if let Some(column) = &column {
                column_levels.insert(column.clone());
            }
            let cell = cells.entry((row, column)).or_default();
            cell.weight += weight;
            cell.records += 1;
        }

        let included_records: usize = cells.values().map(|c| c.records).sum();
        if included_records == 0 {
            return Err(TabulationError::InsufficientData {
                dimension: request.rows.name().to_string(),
                levels: 0,
            });
        }

        let rows: Vec<Category> = row_levels.into_iter().collect();
        let columns: Option<Vec<Category>> = request
            .columns
            .as_ref()
            .map(|_| column_levels.into_iter().collect());

        let grid = build_grid(&rows, columns.as_deref(), &cells);
        let (row_totals, column_totals, total_weight) = totals(&grid);
        let matrix = percentages(&grid, &row_totals, &column_totals, total_weight);

        let test = match &columns {
            Some(_) => Some(self.chi_square(request, &grid, included_records)?),
            None => None,
        };

        debug!(
            table = %request.name,
            rows = rows.len(),
            columns = columns.as_ref().map_or(1, Vec::len),
            included_records,
            "tabulated"
        );

        Ok(TabulationResult {
            name: request.name.clone(),
            weight: request.weight.clone(),
            stratum,
            rows: Dimension {
                field: request.rows.name().to_string(),
                levels: rows,
            },
            columns: request
                .columns
                .as_ref()
                .zip(columns)
                .map(|(selector, levels)| Dimension {
                    field: selector.name().to_string(),
                    levels,
                }),
            cells: matrix,
            row_totals,
            column_totals,
            total_weight,
            included_records,
            excluded,
            test,
        })
    }

    /// Runs the test over every level present in the table, so the degrees of
    /// freedom match the reported dimensions. Zero-weight levels contribute no
    /// expected counts to the statistic.
    fn chi_square(
        &self,
        request: &TabulationRequest,
        grid: &[Vec<Cell>],
        included_records: usize,
    ) -> Result<ChiSquareTest> {
        let rows = grid.len();
        let columns = grid.first().map_or(0, Vec::len);
        if rows < 2 {
            return Err(TabulationError::InsufficientData {
                dimension: request.rows.name().to_string(),
                levels: rows,
            });
        }
        if columns < 2 {
            let dimension = request
                .columns
                .as_ref()
                .map_or_else(String::new, |c| c.name().to_string());
            return Err(TabulationError::InsufficientData {
                dimension,
                levels: columns,
            });
        }

        let total: f64 = grid.iter().flatten().map(|c| c.weight).sum();
        if total <= 0.0 {
            return Err(TabulationError::InsufficientData {
                dimension: request.weight.clone(),
                levels: 0,
            });
        }

        let scale = match self.settings.chi_square_scale {
            ChiSquareScale::Weighted => 1.0,
            ChiSquareScale::Normalized => included_records as f64 / total,
        };
        let table = ContingencyTable {
            observed: grid
                .iter()
                .map(|row| row.iter().map(|c| c.weight * scale).collect())
                .collect(),
            records: grid
                .iter()
                .map(|row| row.iter().map(|c| c.records).collect())
                .collect(),
        };
        pearson(&table, &self.settings)
    }
}

fn skipped(
    request: &TabulationRequest,
    stratum: Option<StratumLevel>,
    err: &TabulationError,
) -> TableOutcome {
    TableOutcome::Skipped {
        name: request.name.clone(),
        stratum,
        reason: err.to_string(),
    }
}

/// Dense `rows x columns` grid; single-dimension tables get one column.
fn build_grid(
    rows: &[Category],
    columns: Option<&[Category]>,
    cells: &BTreeMap<(Category, Option<Category>), Cell>,
) -> Vec<Vec<Cell>> {
    rows.iter()
        .map(|row| match columns {
            Some(columns) => columns
                .iter()
                .map(|column| {
                    cells
                        .get(&(row.clone(), Some(column.clone())))
                        .copied()
                        .unwrap_or_default()
                })
                .collect(),
            None => vec![cells.get(&(row.clone(), None)).copied().unwrap_or_default()],
        })
        .collect()
}

fn totals(grid: &[Vec<Cell>]) -> (Vec<f64>, Vec<f64>, f64) {
    let weights: Vec<Vec<f64>> = grid
        .iter()
        .map(|row| row.iter().map(|c| c.weight).collect())
        .collect();
    totals_of(&weights)
}

fn totals_of(weights: &[Vec<f64>]) -> (Vec<f64>, Vec<f64>, f64) {
    let width = weights.first().map_or(0, Vec::len);
    let rows: Vec<f64> = weights.iter().map(|row| row.iter().sum()).collect();
    let columns: Vec<f64> = (0..width)
        .map(|j| weights.iter().map(|row| row[j]).sum())
        .collect();
    let total = rows.iter().sum();
    (rows, columns, total)
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 { part / whole * 100.0 } else { 0.0 }
}

fn percentages(
    grid: &[Vec<Cell>],
    row_totals: &[f64],
    column_totals: &[f64],
    total: f64,
) -> Vec<Vec<WeightedCount>> {
    grid.iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .enumerate()
                .map(|(j, cell)| WeightedCount {
                    weight: cell.weight,
                    records: cell.records,
                    row_percent: percent(cell.weight, row_totals[i]),
                    column_percent: percent(cell.weight, column_totals[j]),
                    total_percent: percent(cell.weight, total),
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use survey_model::{
        DerivedField, DerivedFields, FieldSelector, HypertensionStatus, SubjectId, Value,
    };

    fn record(id: u32, weight: Value, status: HypertensionStatus, work: Value) -> SubjectRecord {
        let mut record = SubjectRecord::new(SubjectId::parse(&id.to_string()).unwrap());
        record.fields.insert("WTMEC2YR".to_string(), weight);
        record.fields.insert("OCQ670".to_string(), work);
        record.attach_derived(DerivedFields {
            hypertension: status,
            ..DerivedFields::default()
        });
        record
    }

    fn dataset(records: Vec<SubjectRecord>) -> Dataset {
        Dataset {
            modules: vec!["DEMO".to_string()],
            records,
        }
    }

    fn hypertension() -> FieldSelector {
        FieldSelector::Derived(DerivedField::Hypertension)
    }

    #[test]
    fn one_way_counts_and_missing_weights() {
        use HypertensionStatus::{Indeterminate, Negative, Positive};
        let data = dataset(vec![
            record(1, Value::Number(100.0), Positive, Value::Missing),
            record(2, Value::Number(300.0), Negative, Value::Missing),
            record(3, Value::Number(100.0), Indeterminate, Value::Missing),
            record(4, Value::Missing, Positive, Value::Missing),
            record(5, Value::Number(-2.0), Positive, Value::Missing),
        ]);
        let request = TabulationRequest::one_way("ht", hypertension(), "WTMEC2YR");
        let engine = TabulationEngine::default();
        let outcomes = engine.run(&data, &request);
        let result = outcomes[0].result().expect("computed");

        assert_eq!(result.rows.levels.len(), 3);
        assert_eq!(result.total_weight, 500.0);
        assert_eq!(result.included_records, 3);
        assert_eq!(result.excluded.missing_weight, 1);
        assert_eq!(result.excluded.negative_weight, 1);
        assert!(result.test.is_none());
        // Negative < Positive < Indeterminate in declared order.
        assert_eq!(result.cells[0][0].weight, 300.0);
        assert_eq!(result.cells[0][0].total_percent, 60.0);
        assert_eq!(result.cells[2][0].weight, 100.0);
    }

    #[test]
    fn two_way_has_missing_pseudo_category() {
        use HypertensionStatus::{Negative, Positive};
        let data = dataset(vec![
            record(1, Value::Number(10.0), Positive, Value::Number(1.0)),
            record(2, Value::Number(10.0), Negative, Value::Number(1.0)),
            record(3, Value::Number(10.0), Positive, Value::Number(3.0)),
            record(4, Value::Number(10.0), Negative, Value::Missing),
        ]);
        let request = TabulationRequest::two_way(
            "ht_by_work",
            hypertension(),
            FieldSelector::Column("OCQ670".to_string()),
            "WTMEC2YR",
        );
        let result = TabulationEngine::default()
            .run(&data, &request)
            .remove(0)
            .result()
            .cloned()
            .expect("computed");
        let columns = result.columns.as_ref().expect("two-way");
        assert_eq!(columns.levels.len(), 3);
        assert!(columns.levels[2].is_missing());
        let test = result.test.expect("chi-square");
        assert_eq!(test.degrees_of_freedom, 2);
    }

    #[test]
    fn drop_missing_counts_exclusions() {
        use HypertensionStatus::{Negative, Positive};
        let data = dataset(vec![
            record(1, Value::Number(10.0), Positive, Value::Number(1.0)),
            record(2, Value::Number(10.0), Negative, Value::Number(1.0)),
            record(3, Value::Number(10.0), Positive, Value::Number(3.0)),
            record(4, Value::Number(10.0), Negative, Value::Number(3.0)),
            record(5, Value::Number(10.0), Negative, Value::Missing),
        ]);
        let request = TabulationRequest::two_way(
            "ht_by_work",
            hypertension(),
            FieldSelector::Column("OCQ670".to_string()),
            "WTMEC2YR",
        )
        .with_drop_missing(true);
        let outcomes = TabulationEngine::default().run(&data, &request);
        let result = outcomes[0].result().expect("computed");
        assert_eq!(result.excluded.missing_category, 1);
        assert_eq!(result.included_records, 4);
        assert_eq!(result.columns.as_ref().map(|c| c.levels.len()), Some(2));
    }

    #[test]
    fn single_column_level_is_insufficient() {
        use HypertensionStatus::{Negative, Positive};
        let data = dataset(vec![
            record(1, Value::Number(10.0), Positive, Value::Number(1.0)),
            record(2, Value::Number(10.0), Negative, Value::Number(1.0)),
        ]);
        let request = TabulationRequest::two_way(
            "ht_by_work",
            hypertension(),
            FieldSelector::Column("OCQ670".to_string()),
            "WTMEC2YR",
        );
        let outcomes = TabulationEngine::default().run(&data, &request);
        assert!(outcomes[0].is_skipped());
        let TableOutcome::Skipped { reason, .. } = &outcomes[0] else {
            unreachable!()
        };
        insta::assert_snapshot!(reason, @"insufficient data: OCQ670 has 1 non-empty level(s)");
    }

    #[test]
    fn unknown_weight_skips_table() {
        let data = dataset(vec![record(
            1,
            Value::Number(1.0),
            HypertensionStatus::Positive,
            Value::Missing,
        )]);
        let request = TabulationRequest::one_way("ht", hypertension(), "WTINT2YR");
        let outcomes = TabulationEngine::default().run(&data, &request);
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_skipped());
    }

    #[test]
    fn zero_weight_records_are_included() {
        let data = dataset(vec![
            record(1, Value::Number(0.0), HypertensionStatus::Positive, Value::Missing),
            record(2, Value::Number(5.0), HypertensionStatus::Negative, Value::Missing),
        ]);
        let request = TabulationRequest::one_way("ht", hypertension(), "WTMEC2YR");
        let outcomes = TabulationEngine::default().run(&data, &request);
        let result = outcomes[0].result().expect("computed");
        assert_eq!(result.included_records, 2);
        assert_eq!(result.total_weight, 5.0);
        assert_eq!(result.cells[1][0].records, 1);
        assert_eq!(result.cells[1][0].total_percent, 0.0);
    }

    #[test]
    fn zero_weight_level_counts_toward_degrees_of_freedom() {
        use HypertensionStatus::{Indeterminate, Negative, Positive};
        let data = dataset(vec![
            record(1, Value::Number(10.0), Positive, Value::Number(1.0)),
            record(2, Value::Number(20.0), Negative, Value::Number(1.0)),
            record(3, Value::Number(30.0), Positive, Value::Number(3.0)),
            record(4, Value::Number(15.0), Negative, Value::Number(3.0)),
            record(5, Value::Number(0.0), Indeterminate, Value::Number(1.0)),
        ]);
        let request = TabulationRequest::two_way(
            "ht_by_work",
            hypertension(),
            FieldSelector::Column("OCQ670".to_string()),
            "WTMEC2YR",
        );
        let outcomes = TabulationEngine::default().run(&data, &request);
        let result = outcomes[0].result().expect("computed");
        let rows = result.rows.levels.len();
        let columns = result.columns.as_ref().map_or(0, |c| c.levels.len());
        assert_eq!((rows, columns), (3, 2));
        let test = result.test.expect("chi-square");
        assert_eq!(test.degrees_of_freedom, (rows - 1) * (columns - 1));
        assert!(test.statistic.is_finite());
        assert!((0.0..=1.0).contains(&test.p_value));
    }

    #[test]
    fn all_zero_weights_skip_the_test() {
        use HypertensionStatus::{Negative, Positive};
        let data = dataset(vec![
            record(1, Value::Number(0.0), Positive, Value::Number(1.0)),
            record(2, Value::Number(0.0), Negative, Value::Number(3.0)),
        ]);
        let request = TabulationRequest::two_way(
            "ht_by_work",
            hypertension(),
            FieldSelector::Column("OCQ670".to_string()),
            "WTMEC2YR",
        );
        let outcomes = TabulationEngine::default().run(&data, &request);
        assert!(outcomes[0].is_skipped());
    }
}
