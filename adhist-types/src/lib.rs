//! Shared data model, configuration primitives, and the workspace error type for adhist.
#![warn(missing_docs)]

mod config;
mod error;
mod model;
mod plan;
mod reports;

pub use config::{AdhistConfig, ContextBucketConfig, DataSplit, ReferencePaths, SplitPair};
pub use error::{AdhistError, OverflowDirection};
pub use model::{Ad, AdId, Annotation, Document, DocumentId, Event, EventId, GroupKey};
pub use plan::{CounterWidth, Dimension, FeatureSet, Grouping};
pub use reports::{MergeStats, RunReport};
