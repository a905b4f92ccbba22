//! Tests for screening, merging and deriving together.

use std::collections::BTreeMap;

use proptest::prelude::*;
use survey_model::{
    AnalysisConfig, HypertensionStatus, IssueKind, ModuleSpec, ModuleTable, Row, Value,
};
use survey_transform::{MergeError, prepare_dataset};

fn table(name: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> ModuleTable {
    let mut table = ModuleTable::new(name, columns.iter().map(|c| (*c).to_string()).collect());
    for values in rows {
        let row: Row = columns.iter().map(|c| (*c).to_string()).zip(values).collect();
        table.push_row(row);
    }
    table
}

fn n(v: f64) -> Value {
    Value::Number(v)
}

fn config() -> AnalysisConfig {
    AnalysisConfig {
        modules: vec![
            ModuleSpec::new("DEMO", "DEMO_J.csv", true),
            ModuleSpec::new("BPX", "BPX_J.csv", true),
            ModuleSpec::new("OCQ", "OCQ_J.csv", false),
        ],
        ..AnalysisConfig::default()
    }
}

#[test]
fn demographics_only_subject_survives_as_indeterminate() {
    let demo = table(
        "DEMO",
        &["SEQN", "RIDAGEYR", "WTMEC2YR"],
        vec![vec![n(1.0), n(50.0), n(1000.0)], vec![n(2.0), n(35.0), n(500.0)]],
    );
    let bpx = table(
        "BPX",
        &["SEQN", "BPXSY1", "BPXDI1"],
        vec![vec![n(1.0), n(120.0), n(70.0)]],
    );

    let prepared = prepare_dataset(vec![demo, bpx], &config()).expect("prepare");
    assert_eq!(prepared.dataset.len(), 2);

    let second = &prepared.dataset.records[1];
    assert!(second.missing_modules.contains("BPX"));
    let derived = second.derived.as_ref().expect("derived");
    assert_eq!(derived.hypertension, HypertensionStatus::Indeterminate);
    assert_eq!(prepared.derivation.indeterminate_hypertension, 1);
}

#[test]
fn optional_module_without_id_is_excluded_and_reported() {
    let demo = table("DEMO", &["SEQN"], vec![vec![n(1.0)]]);
    let bpx = table("BPX", &["SEQN", "BPXSY1"], vec![vec![n(1.0), n(120.0)]]);
    let ocq = table("OCQ", &["RESPONDENT", "OCQ670"], vec![vec![n(1.0), n(3.0)]]);

    let prepared = prepare_dataset(vec![demo, bpx, ocq], &config()).expect("prepare");
    assert_eq!(prepared.dataset.modules, vec!["DEMO", "BPX"]);
    assert_eq!(prepared.issues.len(), 1);
    assert_eq!(prepared.issues[0].kind, IssueKind::ModuleExcluded);
    assert_eq!(prepared.issues[0].count, Some(1));
    assert!(!prepared.dataset.records[0].fields.contains_key("OCQ670"));
    assert!(prepared.dataset.records[0].missing_modules.contains("OCQ"));
    assert_eq!(prepared.merge.missing_by_module.get("OCQ"), Some(&1));
}

#[test]
fn required_module_without_id_aborts() {
    let demo = table("DEMO", &["ID"], vec![vec![n(1.0)]]);
    let err = prepare_dataset(vec![demo], &config()).unwrap_err();
    assert!(matches!(err, MergeError::Schema { ref module, .. } if module == "DEMO"));
}

#[test]
fn duplicate_key_aborts_the_run() {
    let demo = table("DEMO", &["SEQN"], vec![vec![n(1.0)], vec![n(1.0)]]);
    let err = prepare_dataset(vec![demo], &config()).unwrap_err();
    assert!(matches!(err, MergeError::DuplicateKey { .. }));
}

fn reading() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Missing),
        Just(Value::Number(0.0)),
        (40u32..200).prop_map(|v| Value::Number(f64::from(v))),
    ]
}

proptest! {
    #[test]
    fn zero_only_diastolic_never_averages_to_zero(
        dia in proptest::collection::vec(prop_oneof![Just(Value::Missing), Just(Value::Number(0.0))], 3),
    ) {
        let cfg = config();
        let mut bpx = table(
            "BPX",
            &["SEQN", "BPXDI1", "BPXDI2", "BPXDI3"],
            vec![vec![n(1.0), dia[0].clone(), dia[1].clone(), dia[2].clone()]],
        );
        bpx.remap_sentinels(&cfg.effective_sentinels());
        let demo = table("DEMO", &["SEQN"], vec![vec![n(1.0)]]);

        let prepared = prepare_dataset(vec![demo, bpx], &cfg).expect("prepare");
        let derived = prepared.dataset.records[0].derived.clone().expect("derived");
        prop_assert_eq!(derived.diastolic_mean, None);
    }

    #[test]
    fn preparation_is_deterministic(
        rows in proptest::collection::vec(
            (1u32..40, reading(), reading(), reading(), reading()),
            1..30,
        ),
    ) {
        let mut ids = BTreeMap::new();
        for (id, s1, s2, d1, d2) in rows {
            ids.insert(id, vec![n(f64::from(id)), s1, s2, d1, d2]);
        }
        let build = || {
            let cfg = config();
            let mut bpx = table(
                "BPX",
                &["SEQN", "BPXSY1", "BPXSY2", "BPXDI1", "BPXDI2"],
                ids.values().cloned().collect(),
            );
            bpx.remap_sentinels(&cfg.effective_sentinels());
            let demo = table(
                "DEMO",
                &["SEQN"],
                ids.keys().rev().map(|id| vec![n(f64::from(*id))]).collect(),
            );
            prepare_dataset(vec![demo, bpx], &cfg).expect("prepare").dataset
        };
        prop_assert_eq!(build(), build());
    }
}
