use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which bound a counter ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowDirection {
    /// The counter was already at its representable maximum.
    Positive,
    /// The counter was already at its representable minimum.
    Negative,
}

impl std::fmt::Display for OverflowDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Positive => f.write_str("positive"),
            Self::Negative => f.write_str("negative"),
        }
    }
}

/// Unified error type for the adhist workspace.
///
/// Every variant is fatal for the run that produced it: the generator is a batch
/// job meant to be rerun from scratch, so nothing here is retried.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq)]
#[non_exhaustive]
pub enum AdhistError {
    /// A fixed-width counter would have wrapped.
    #[error("{direction} overflow in {dimension} counter")]
    CounterOverflow {
        /// Bound that was hit.
        direction: OverflowDirection,
        /// Dimension label of the counter map (e.g. "ad", "ad_doc").
        dimension: String,
    },

    /// A numeric field in an input row could not be parsed.
    #[error("malformed {field} field: {value:?}")]
    Parse {
        /// Logical field name (e.g. "event_id").
        field: String,
        /// Raw text that failed to parse.
        value: String,
    },

    /// A row referenced an id absent from the loaded reference tables.
    #[error("missing {kind} reference: {id}")]
    MissingReference {
        /// Table that was consulted ("event", "ad", "document").
        kind: String,
        /// Id that could not be resolved.
        id: u64,
    },

    /// Filesystem failure while opening, reading, or writing a file.
    #[error("io error on {path}: {msg}")]
    Io {
        /// Path involved in the failed operation.
        path: String,
        /// Human-readable error message.
        msg: String,
    },

    /// The CSV layer rejected a record.
    #[error("csv error: {0}")]
    Csv(String),

    /// The future pre-pass was requested a second time for the same run.
    #[error("future counters already seeded for {run}")]
    AlreadySeeded {
        /// Run label.
        run: String,
    },

    /// The merge-join pass was requested before the future pre-pass.
    #[error("merge requested before future counters were seeded for {run}")]
    NotSeeded {
        /// Run label.
        run: String,
    },

    /// The run already completed its merge-join pass.
    #[error("run {run} already finished")]
    RunFinished {
        /// Run label.
        run: String,
    },

    /// Configuration is inconsistent or incomplete.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// A single (feature-set, split-pair) run failed.
    #[error("run {run} failed: {source}")]
    RunFailed {
        /// Run label.
        run: String,
        /// Underlying failure.
        source: Box<AdhistError>,
    },

    /// Several runs failed; contains each failure.
    #[error("{n} runs failed: {0:?}", n = .0.len())]
    AllRunsFailed(Vec<AdhistError>),

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl AdhistError {
    /// Helper: build a `CounterOverflow` error.
    pub fn overflow(direction: OverflowDirection, dimension: impl Into<String>) -> Self {
        Self::CounterOverflow {
            direction,
            dimension: dimension.into(),
        }
    }

    /// Helper: build a `Parse` error for a field and its raw value.
    pub fn parse(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Parse {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Helper: build a `MissingReference` error.
    pub fn missing(kind: impl Into<String>, id: impl Into<u64>) -> Self {
        Self::MissingReference {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Helper: build an `Io` error tagged with the path it concerns.
    pub fn io(path: impl AsRef<std::path::Path>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            msg: err.to_string(),
        }
    }

    /// Helper: tag an error with the run it belongs to.
    pub fn in_run(self, run: impl Into<String>) -> Self {
        Self::RunFailed {
            run: run.into(),
            source: Box::new(self),
        }
    }

    /// True if this error came from a saturated counter, possibly wrapped in a run failure.
    #[must_use]
    pub fn is_overflow(&self) -> bool {
        match self {
            Self::CounterOverflow { .. } => true,
            Self::RunFailed { source, .. } => source.is_overflow(),
            _ => false,
        }
    }

    /// Flatten nested `AllRunsFailed` structures into a plain vector.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::AllRunsFailed(list) => list.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}
