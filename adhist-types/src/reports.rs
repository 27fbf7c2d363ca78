//! Report envelopes produced by the engine and the orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Row and group counts of one merge-join pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MergeStats {
    /// Rows read from (and written for) the scored stream.
    pub scored_rows: u64,
    /// Rows read from (and written for) the unscored stream.
    pub unscored_rows: u64,
    /// Event groups flushed from the scored stream.
    pub scored_groups: u64,
    /// Event groups flushed from the unscored stream.
    pub unscored_groups: u64,
}

impl MergeStats {
    /// Total rows consumed from both streams.
    #[must_use]
    pub const fn total_rows(&self) -> u64 {
        self.scored_rows + self.unscored_rows
    }
}

/// Summary of one (feature-set, split-pair) run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// Feature set name.
    pub feature_set: String,
    /// Scored split name.
    pub scored_split: String,
    /// Unscored split name.
    pub unscored_split: String,
    /// Rows folded into the future counters by the pre-pass.
    pub seeded_rows: u64,
    /// Merge-join statistics.
    pub merge: MergeStats,
    /// Wall-clock time of the pre-pass.
    pub seed_elapsed: Duration,
    /// Wall-clock time of the merge-join pass.
    pub merge_elapsed: Duration,
}
