use std::sync::Arc;

use adhist_types::{AdhistError, Dimension, MergeStats};

use crate::grouping::GroupExtractor;
use crate::io::{RowSink, RowSource};
use crate::reference::ReferenceData;
use crate::strategy::AggregationStrategy;

/// Where a [`CausalRun`] stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No pass has run yet.
    Fresh,
    /// Future counters hold the seeded stream.
    Seeded,
    /// The merge-join pass completed.
    Merged,
    /// A pass failed; counters are in an undefined state.
    Failed,
}

/// One strategy instance driven through seed-then-merge exactly once.
///
/// Seeding twice would double the future counters and merging unseeded would
/// retract rows that were never added, so both are rejected.
pub struct CausalRun {
    label: String,
    strategy: Box<dyn AggregationStrategy>,
    extractor: Arc<dyn GroupExtractor>,
    refs: Arc<ReferenceData>,
    phase: Phase,
    progress_every: u64,
}

impl std::fmt::Debug for CausalRun {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CausalRun")
            .field("label", &self.label)
            .field("dimension", &self.strategy.dimension())
            .field("grouping", &self.extractor.grouping())
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

impl CausalRun {
    /// Wrap a fresh strategy. `label` names the run in errors.
    pub fn new(
        label: impl Into<String>,
        strategy: Box<dyn AggregationStrategy>,
        extractor: Arc<dyn GroupExtractor>,
        refs: Arc<ReferenceData>,
    ) -> Self {
        Self {
            label: label.into(),
            strategy,
            extractor,
            refs,
            phase: Phase::Fresh,
            progress_every: 0,
        }
    }

    /// Report progress every `rows` rows (0 disables).
    #[must_use]
    pub const fn with_progress_every(mut self, rows: u64) -> Self {
        self.progress_every = rows;
        self
    }

    /// Run label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Dimension of the wrapped strategy.
    #[must_use]
    pub fn dimension(&self) -> Dimension {
        self.strategy.dimension()
    }

    /// Output columns of the wrapped strategy.
    #[must_use]
    pub fn header(&self) -> &'static [&'static str] {
        self.strategy.header()
    }

    fn finished(&self) -> Option<AdhistError> {
        matches!(self.phase, Phase::Merged | Phase::Failed).then(|| AdhistError::RunFinished {
            run: self.label.clone(),
        })
    }

    /// Seed the future counters from `source`. Returns the rows seeded.
    ///
    /// # Errors
    /// `AlreadySeeded` on a second call, `RunFinished` after the merge, and any
    /// error of the pass itself (which moves the run to [`Phase::Failed`]).
    pub fn seed_future(&mut self, source: &mut dyn RowSource) -> Result<u64, AdhistError> {
        if let Some(err) = self.finished() {
            return Err(err);
        }
        if self.phase == Phase::Seeded {
            return Err(AdhistError::AlreadySeeded {
                run: self.label.clone(),
            });
        }
        let seeded = super::seed_future(
            self.strategy.as_mut(),
            self.extractor.as_ref(),
            &self.refs,
            source,
            self.progress_every,
        );
        self.phase = if seeded.is_ok() {
            Phase::Seeded
        } else {
            Phase::Failed
        };
        seeded
    }

    /// Run the merge-join pass over both streams.
    ///
    /// # Errors
    /// `NotSeeded` before [`seed_future`](Self::seed_future), `RunFinished` on a
    /// second call, and any error of the pass itself.
    pub fn merge_join(
        &mut self,
        scored: &mut dyn RowSource,
        unscored: &mut dyn RowSource,
        scored_out: &mut dyn RowSink,
        unscored_out: &mut dyn RowSink,
    ) -> Result<MergeStats, AdhistError> {
        if let Some(err) = self.finished() {
            return Err(err);
        }
        if self.phase == Phase::Fresh {
            return Err(AdhistError::NotSeeded {
                run: self.label.clone(),
            });
        }
        let merged = super::merge_join(
            self.strategy.as_mut(),
            self.extractor.as_ref(),
            &self.refs,
            scored,
            unscored,
            scored_out,
            unscored_out,
            self.progress_every,
        );
        self.phase = if merged.is_ok() {
            Phase::Merged
        } else {
            Phase::Failed
        };
        merged
    }
}
