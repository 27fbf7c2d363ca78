//! adhist generates causal, leakage-free interaction-history features from
//! sorted click logs.
//!
//! Overview
//! - A plan is a list of feature sets (grouping × dimension × counter width)
//!   and a list of split pairs (a labeled, scored log and an unlabeled one).
//! - Every (feature set, split pair) is one run: the scored log seeds the future
//!   counters, then both logs are merge-joined in event order and each row is
//!   written with the past and future statistics of its group.
//! - Runs are independent; [`Adhist::run_all`] executes them on the Tokio
//!   blocking pool with bounded concurrency.
//!
//! Key behaviors and trade-offs
//! - Counters are fixed-width per feature set. A saturated counter aborts its
//!   run instead of wrapping; pick a wider width and rerun.
//! - Reference tables are loaded once and shared by every run. Memory is
//!   dominated by them and by the counter maps of runs in flight.
//! - Context-bucket ids come from one process-wide table, so runs agree on ids.
//!
//! Examples
//! ```rust,ignore
//! use adhist::Adhist;
//!
//! let adhist = Adhist::builder()
//!     .output_dir("cache")
//!     .max_concurrent_runs(4)
//!     .build()?;
//! for report in adhist.run_all().await? {
//!     let rows = report.merge.total_rows();
//!     println!("{} {}: {rows} rows", report.feature_set, report.scored_split);
//! }
//! ```
#![warn(missing_docs)]

pub(crate) mod core;
mod io;
mod load;

pub use self::core::{Adhist, AdhistBuilder, collapse_errors};
pub use io::{GzCsvRowSink, GzCsvRowSource};
pub use load::load_reference;

// Re-export core types for convenience
pub use adhist_core::{
    AdhistConfig, AdhistError, ContextBucketConfig, ContextTable, CounterWidth, DataSplit,
    Dimension, FeatureSet, Grouping, MergeStats, ReferenceData, ReferencePaths, RunReport,
    SplitPair,
};
