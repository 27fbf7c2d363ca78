use std::fs::File;
use std::path::Path;

use adhist::{Adhist, AdhistError, CounterWidth, Dimension, FeatureSet, Grouping};
use adhist_core::InteractionRow;
use adhist_mock::Dataset;
use flate2::read::MultiGzDecoder;

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut rdr = csv::Reader::from_reader(MultiGzDecoder::new(File::open(path).unwrap()));
    let header = rdr.headers().unwrap().iter().map(String::from).collect();
    let rows = rdr
        .records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect();
    (header, rows)
}

fn fs(name: &str, grouping: Grouping, dimension: Dimension, counter: CounterWidth) -> FeatureSet {
    FeatureSet::new(name, grouping, dimension, counter)
}

#[tokio::test]
async fn three_event_plan_writes_hand_checked_files() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = Dataset::three_events().write_to_dir(dir.path()).unwrap();
    let adhist = Adhist::builder()
        .config(cfg)
        .feature_sets(vec![
            fs("uid_viewed_grps", Grouping::Uid, Dimension::Group, CounterWidth::U16),
            fs("uid_viewed_ads", Grouping::Uid, Dimension::Ad, CounterWidth::U8),
            fs("uid_viewed_ad_cats", Grouping::Uid, Dimension::Category, CounterWidth::F32),
        ])
        .build()
        .unwrap();

    let reports = adhist.run_all().await.unwrap();
    assert_eq!(reports.len(), 3);
    for r in &reports {
        assert_eq!(r.seeded_rows, 3);
        assert_eq!(r.merge.scored_rows, 3);
        assert_eq!(r.merge.unscored_rows, 1);
    }

    let (header, rows) = read_rows(&adhist.output_path("uid_viewed_grps", "train"));
    assert_eq!(
        header,
        ["grp_past_views", "grp_past_clicks", "grp_future_views", "grp_future_clicks"]
    );
    assert_eq!(rows, [["0", "0", "2", "1"], ["1", "1", "1", "1"], ["2", "1", "0", "0"]]);
    let (_, rows) = read_rows(&adhist.output_path("uid_viewed_grps", "test"));
    assert_eq!(rows, [["3", "2", "0", "0"]]);

    let (header, rows) = read_rows(&adhist.output_path("uid_viewed_ads", "train"));
    assert_eq!(header.len(), 8);
    assert_eq!(rows[1], ["1", "1", "1", "1", "0", "0", "0", "0"]);

    let (_, rows) = read_rows(&adhist.output_path("uid_viewed_ad_cats", "train"));
    let future: f32 = rows[0][2].parse().unwrap();
    assert!((future - 0.52).abs() < 1e-6);
    // ad 2 lands on an unannotated document
    assert_eq!(rows[2], ["0", "0", "0", "0"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_runs_match_sequential_output() {
    let ds = Dataset::synthetic(42, 600);
    let seq_dir = tempfile::tempdir().unwrap();
    let par_dir = tempfile::tempdir().unwrap();

    let seq = Adhist::builder()
        .config(ds.write_to_dir(seq_dir.path()).unwrap())
        .build()
        .unwrap();
    let par = Adhist::builder()
        .config(ds.write_to_dir(par_dir.path()).unwrap())
        .max_concurrent_runs(4)
        .build()
        .unwrap();

    let seq_reports = seq.run_all().await.unwrap();
    let par_reports = par.run_all().await.unwrap();
    assert_eq!(seq_reports.len(), 11);
    for (a, b) in seq_reports.iter().zip(&par_reports) {
        assert_eq!(a.feature_set, b.feature_set);
        assert_eq!(a.merge, b.merge);
    }

    for (fs, _) in seq.jobs() {
        for split in ["train", "test"] {
            assert_eq!(
                read_rows(&seq.output_path(&fs.name, split)),
                read_rows(&par.output_path(&fs.name, split)),
                "{} {split}",
                fs.name
            );
        }
    }
}

/// The three-event scenario with 300 extra views of ad 1 in event 1.
fn flooded() -> Dataset {
    let mut ds = Dataset::three_events();
    let train = &mut ds.splits[0].rows;
    let mut rows: Vec<_> = (0..300).map(|_| InteractionRow::scored(1, 1, false)).collect();
    rows.append(train);
    *train = rows;
    ds
}

#[tokio::test]
async fn saturated_counters_fail_their_runs() {
    let ds = flooded();
    let dir = tempfile::tempdir().unwrap();
    let adhist = Adhist::builder()
        .config(ds.write_to_dir(dir.path()).unwrap())
        .feature_sets(vec![
            fs("narrow_grps", Grouping::Uid, Dimension::Group, CounterWidth::U8),
            fs("wide_grps", Grouping::Uid, Dimension::Group, CounterWidth::U16),
        ])
        .build()
        .unwrap();

    let err = adhist.run_all().await.unwrap_err();
    assert!(err.is_overflow());
    match err {
        AdhistError::RunFailed { run, .. } => assert_eq!(run, "narrow_grps[train/test]"),
        other => panic!("unexpected {other:?}"),
    }
    // the other run still completed
    let (_, rows) = read_rows(&adhist.output_path("wide_grps", "train"));
    assert_eq!(rows.len(), 303);
}

#[tokio::test]
async fn several_failures_are_collected() {
    let ds = flooded();
    let dir = tempfile::tempdir().unwrap();
    let adhist = Adhist::builder()
        .config(ds.write_to_dir(dir.path()).unwrap())
        .feature_sets(vec![
            fs("a", Grouping::Uid, Dimension::Ad, CounterWidth::U8),
            fs("b", Grouping::Context, Dimension::Campaign, CounterWidth::U8),
        ])
        .build()
        .unwrap();

    let err = adhist.run_all().await.unwrap_err();
    let all = err.flatten();
    assert_eq!(all.len(), 2);
    assert!(all.iter().all(AdhistError::is_overflow));
}
