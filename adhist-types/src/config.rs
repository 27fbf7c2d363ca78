//! Configuration types shared by the orchestrator and the CLI.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::plan::FeatureSet;

/// One input interaction log and the suffix its outputs are named with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataSplit {
    /// Split label used in output names, e.g. `val_train`.
    pub name: String,
    /// Path to the gzip CSV interaction log.
    pub path: PathBuf,
}

impl DataSplit {
    /// Build a split descriptor.
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// A scored log and the unscored log that follows it in event order.
///
/// The scored log (stream A) seeds the future counters and commits into the
/// past; the unscored log (stream B) is only featurized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPair {
    /// Labeled stream.
    pub scored: DataSplit,
    /// Unlabeled stream.
    pub unscored: DataSplit,
}

/// Paths of the gzip CSV reference tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePaths {
    /// `event_id,uid,document_id,timestamp,platform,location`
    pub events: PathBuf,
    /// `ad_id,document_id,campaign_id,advertiser_id`
    pub ads: PathBuf,
    /// `document_id,source_id,publisher_id`
    pub documents: PathBuf,
    /// `document_id,category_id,confidence`
    pub categories: PathBuf,
    /// `document_id,topic_id,confidence`
    pub topics: PathBuf,
}

impl Default for ReferencePaths {
    fn default() -> Self {
        Self {
            events: PathBuf::from("cache/events.csv.gz"),
            ads: PathBuf::from("cache/ads.csv.gz"),
            documents: PathBuf::from("cache/documents.csv.gz"),
            categories: PathBuf::from("../input/documents_categories.csv.gz"),
            topics: PathBuf::from("../input/documents_topics.csv.gz"),
        }
    }
}

/// Parameters of the time/platform/location grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBucketConfig {
    /// Width of one time window in hours.
    pub window_hours: u32,
    /// Number of windows in the weekly cycle.
    pub windows_per_week: u32,
    /// Number of leading location characters kept.
    pub location_prefix: usize,
}

impl Default for ContextBucketConfig {
    fn default() -> Self {
        Self {
            window_hours: 3,
            windows_per_week: 7 * 8,
            location_prefix: 5,
        }
    }
}

/// Global configuration for the `Adhist` orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdhistConfig {
    /// Reference tables to load before any run.
    pub reference: ReferencePaths,
    /// Pairs of (scored, unscored) interaction logs.
    pub split_pairs: Vec<SplitPair>,
    /// Feature sets to generate for every split pair.
    pub feature_sets: Vec<FeatureSet>,
    /// Directory receiving `<feature-set>_<split>.csv.gz` files.
    pub output_dir: PathBuf,
    /// Log progress every this many rows (0 disables progress lines).
    pub progress_every: u64,
    /// Buffer size for gzip readers and writers, in bytes.
    pub io_buffer_bytes: usize,
    /// Maximum number of runs executed at once.
    pub max_concurrent_runs: usize,
    /// Parameters of the context grouping.
    pub context: ContextBucketConfig,
}

impl Default for AdhistConfig {
    fn default() -> Self {
        Self {
            reference: ReferencePaths::default(),
            split_pairs: vec![
                SplitPair {
                    scored: DataSplit::new("val_train", "cache/clicks_val_train.csv.gz"),
                    unscored: DataSplit::new("val_test", "cache/clicks_val_test.csv.gz"),
                },
                SplitPair {
                    scored: DataSplit::new("full_train", "../input/clicks_train.csv.gz"),
                    unscored: DataSplit::new("full_test", "../input/clicks_test.csv.gz"),
                },
            ],
            feature_sets: FeatureSet::default_plan(),
            output_dir: PathBuf::from("cache"),
            progress_every: 5_000_000,
            io_buffer_bytes: 1024 * 1024,
            max_concurrent_runs: 1,
            context: ContextBucketConfig::default(),
        }
    }
}
