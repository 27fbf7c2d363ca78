use adhist_types::{
    AdhistConfig, CounterWidth, DataSplit, Dimension, FeatureSet, Grouping, SplitPair,
};

#[test]
fn default_config_roundtrip() {
    let cfg = AdhistConfig::default();

    let json = serde_json::to_string(&cfg).expect("serialize config");
    let de: AdhistConfig = serde_json::from_str(&json).expect("deserialize config");

    assert_eq!(de, cfg);
}

#[test]
fn partial_config_fills_defaults() {
    let json = r#"{
        "output_dir": "out",
        "max_concurrent_runs": 4,
        "feature_sets": [
            { "name": "uid_viewed_ads", "grouping": "uid", "dimension": "ad", "counter": "u8" }
        ]
    }"#;
    let de: AdhistConfig = serde_json::from_str(json).expect("deserialize partial config");

    assert_eq!(de.output_dir.to_str(), Some("out"));
    assert_eq!(de.max_concurrent_runs, 4);
    assert_eq!(
        de.feature_sets,
        vec![FeatureSet::new(
            "uid_viewed_ads",
            Grouping::Uid,
            Dimension::Ad,
            CounterWidth::U8
        )]
    );
    assert_eq!(de.split_pairs.len(), 2);
    assert_eq!(de.progress_every, 5_000_000);
    assert_eq!(de.context.windows_per_week, 56);
}

#[test]
fn split_pair_roundtrip() {
    let pair = SplitPair {
        scored: DataSplit::new("a", "a.csv.gz"),
        unscored: DataSplit::new("b", "b.csv.gz"),
    };
    let json = serde_json::to_string(&pair).expect("serialize split pair");
    let de: SplitPair = serde_json::from_str(&json).expect("deserialize split pair");
    assert_eq!(de, pair);
}

#[test]
fn default_plan_matches_reference_job() {
    let plan = FeatureSet::default_plan();
    assert_eq!(plan.len(), 11);
    assert_eq!(plan.iter().filter(|f| f.grouping == Grouping::Uid).count(), 6);
    assert!(
        plan.iter()
            .filter(|f| f.dimension.is_weighted())
            .all(|f| f.counter == CounterWidth::F32)
    );
    // the context grouping has no group-only feature set
    assert!(
        !plan
            .iter()
            .any(|f| f.grouping == Grouping::Context && f.dimension == Dimension::Group)
    );
}
