//! adhist-core
//!
//! Building blocks of the causal interaction-history engine.
//!
//! - `counter`: fixed-width and weighted counter buckets with overflow detection.
//! - `reference`: indexed events, ads, documents, and document annotations.
//! - `grouping`: extractors mapping an event to its partition key.
//! - `strategy`: the six aggregation strategies behind one object-safe trait.
//! - `io`: row source/sink contracts and in-memory implementations.
//! - `engine`: the future pre-pass, the merge-join pass, and the run guard that
//!   orders them.
//!
//! Leakage control
//! ---------------
//! Every scored event is featurized with its own contribution removed from the
//! future counters and before it is committed to the past counters. Events
//! earlier in event order therefore appear only as past, later ones only as
//! future, and an event never sees itself.
#![warn(missing_docs)]

/// Counter buckets and the integer widths they can be instantiated with.
pub mod counter;
/// Merge-join engine, future pre-pass, and the run guard.
pub mod engine;
/// Grouping key extractors and the shared context assignment table.
pub mod grouping;
/// Row source and sink contracts.
pub mod io;
/// Reference tables consulted by strategies and extractors.
pub mod reference;
/// Aggregation strategies.
pub mod strategy;

pub use adhist_types::*;
pub use counter::{CounterValue, Counts, Sign};
pub use engine::{CausalRun, Phase, merge_join, seed_future};
pub use grouping::{ContextBucketExtractor, ContextTable, GroupExtractor, UidExtractor};
pub use io::{FeatureValue, InteractionRow, MemorySink, RowSink, RowSource, VecRowSource};
pub use reference::{AnnotationTable, ReferenceData, ReferenceDataBuilder};
pub use strategy::{AggregationStrategy, build_strategy};
