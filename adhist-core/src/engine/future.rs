use adhist_types::AdhistError;

use super::Progress;
use crate::counter::Sign;
use crate::grouping::GroupExtractor;
use crate::io::RowSource;
use crate::reference::ReferenceData;
use crate::strategy::AggregationStrategy;

/// Fold every row of `source` into the future counters of `strategy`.
///
/// The source is drained to its end-of-stream marker. Rows without a label are
/// counted as unclicked views. Returns the number of rows seeded.
///
/// # Errors
/// Stops at the first unknown event, missing reference, counter overflow, or
/// source error; counters keep whatever was folded in before it.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "adhist::engine::seed_future",
        skip_all,
        fields(dimension = ?strategy.dimension(), grouping = ?extractor.grouping()),
    )
)]
pub fn seed_future(
    strategy: &mut dyn AggregationStrategy,
    extractor: &dyn GroupExtractor,
    refs: &ReferenceData,
    source: &mut dyn RowSource,
    progress_every: u64,
) -> Result<u64, AdhistError> {
    let mut progress = Progress::new("seed", progress_every);
    while let Some(row) = source.next_row()? {
        let group = extractor.group_key(refs.event(row.event_id)?)?;
        strategy.update_future(group, row.ad_id, row.clicked.unwrap_or(false), Sign::Plus)?;
        progress.tick();
    }
    progress.done();
    Ok(progress.rows())
}
