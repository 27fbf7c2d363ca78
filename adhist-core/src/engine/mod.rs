//! The two passes of a causal run and the guard that orders them.
//!
//! A run first streams the scored log once through [`seed_future`] so every
//! group's future counters hold the whole stream, then [`merge_join`] walks both
//! logs in event order, moving each scored event from future to past as it is
//! featurized. [`CausalRun`] makes the ordering explicit.

/// Future pre-accumulation pass.
pub mod future;
/// Merge-join pass.
pub mod merge;
/// Phase guard around one strategy instance.
pub mod run;

pub use future::seed_future;
pub use merge::merge_join;
pub use run::{CausalRun, Phase};

/// Row counter that reports every `every` rows when tracing is enabled.
#[derive(Debug)]
pub(crate) struct Progress {
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    pass: &'static str,
    every: u64,
    rows: u64,
}

impl Progress {
    pub(crate) const fn new(pass: &'static str, every: u64) -> Self {
        Self {
            pass,
            every,
            rows: 0,
        }
    }

    pub(crate) fn tick(&mut self) {
        self.rows += 1;
        if self.every > 0 && self.rows % self.every == 0 {
            #[cfg(feature = "tracing")]
            tracing::info!(pass = self.pass, rows = self.rows, "progress");
        }
    }

    pub(crate) const fn rows(&self) -> u64 {
        self.rows
    }

    pub(crate) fn done(&self) {
        #[cfg(feature = "tracing")]
        tracing::debug!(pass = self.pass, rows = self.rows, "pass complete");
    }
}
