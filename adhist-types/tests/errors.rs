use adhist_types::{AdhistError, OverflowDirection};

#[test]
fn overflow_is_detected_through_run_wrapper() {
    let e = AdhistError::overflow(OverflowDirection::Positive, "ad")
        .in_run("uid_viewed_ads[val_train/val_test]");
    assert!(e.is_overflow());
    assert!(!AdhistError::missing("ad", 7u32).is_overflow());
}

#[test]
fn flatten_unwraps_nested_aggregates() {
    let nested = AdhistError::AllRunsFailed(vec![
        AdhistError::Other("a".into()),
        AdhistError::AllRunsFailed(vec![
            AdhistError::parse("event_id", "x"),
            AdhistError::missing("document", 3u32),
        ]),
    ]);
    let flat = nested.flatten();
    assert_eq!(flat.len(), 3);
    assert!(matches!(flat[1], AdhistError::Parse { .. }));
}

#[test]
fn error_roundtrips_through_json() {
    let e = AdhistError::overflow(OverflowDirection::Negative, "cmp");
    let json = serde_json::to_string(&e).expect("serialize error");
    let de: AdhistError = serde_json::from_str(&json).expect("deserialize error");
    assert_eq!(de, e);
}

#[test]
fn aggregate_message_counts_its_runs() {
    let e = AdhistError::AllRunsFailed(vec![
        AdhistError::Other("a".into()),
        AdhistError::Csv("b".into()),
    ]);
    let msg = e.to_string();
    assert!(msg.starts_with("2 runs failed: "), "{msg}");
    assert!(msg.contains("Csv(\"b\")"), "{msg}");
}
