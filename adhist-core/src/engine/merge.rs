use adhist_types::{AdhistError, EventId, MergeStats};

use super::Progress;
use crate::counter::Sign;
use crate::grouping::GroupExtractor;
use crate::io::{InteractionRow, RowSink, RowSource};
use crate::reference::ReferenceData;
use crate::strategy::AggregationStrategy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Scored,
    Unscored,
}

/// Flush-side state of one merge-join pass.
struct Flusher<'a> {
    strategy: &'a mut dyn AggregationStrategy,
    extractor: &'a dyn GroupExtractor,
    refs: &'a ReferenceData,
    scored_out: &'a mut dyn RowSink,
    unscored_out: &'a mut dyn RowSink,
    stats: MergeStats,
}

impl Flusher<'_> {
    fn flush(
        &mut self,
        event_id: EventId,
        origin: Origin,
        rows: &[InteractionRow],
    ) -> Result<(), AdhistError> {
        let group = self.extractor.group_key(self.refs.event(event_id)?)?;
        match origin {
            Origin::Scored => {
                for row in rows {
                    let clicked = row.clicked.unwrap_or(false);
                    self.strategy
                        .update_future(group, row.ad_id, clicked, Sign::Minus)?;
                }
                for row in rows {
                    self.strategy.write(self.scored_out, group, row.ad_id)?;
                }
                for row in rows {
                    let clicked = row.clicked.unwrap_or(false);
                    self.strategy.update_past(group, row.ad_id, clicked)?;
                }
                self.stats.scored_groups += 1;
            }
            Origin::Unscored => {
                for row in rows {
                    self.strategy.write(self.unscored_out, group, row.ad_id)?;
                }
                self.stats.unscored_groups += 1;
            }
        }
        Ok(())
    }
}

/// Walk both streams in event order and featurize every row causally.
///
/// The strategy's future counters must already hold the scored stream (see
/// [`seed_future`](super::seed_future)). Rows sharing an event id and a stream
/// form one group. When the next row starts a new group the pending one is
/// flushed:
///
/// 1. scored groups retract their own rows from the future counters,
/// 2. every row of the group is written to its stream's sink,
/// 3. scored groups then commit their rows to the past counters.
///
/// Unscored groups only write. On equal event ids the scored stream is
/// consumed first. Both sinks receive the strategy header before any row and are
/// finished after the last group.
///
/// # Errors
/// The first source, sink, reference, or overflow error aborts the pass. Rows
/// already written stay in the sinks and must be discarded by the caller.
#[allow(clippy::too_many_arguments)]
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(
        name = "adhist::engine::merge_join",
        skip_all,
        fields(dimension = ?strategy.dimension(), grouping = ?extractor.grouping()),
    )
)]
pub fn merge_join(
    strategy: &mut dyn AggregationStrategy,
    extractor: &dyn GroupExtractor,
    refs: &ReferenceData,
    scored: &mut dyn RowSource,
    unscored: &mut dyn RowSource,
    scored_out: &mut dyn RowSink,
    unscored_out: &mut dyn RowSink,
    progress_every: u64,
) -> Result<MergeStats, AdhistError> {
    let header = strategy.header();
    scored_out.write_header(header)?;
    unscored_out.write_header(header)?;

    let mut flusher = Flusher {
        strategy,
        extractor,
        refs,
        scored_out,
        unscored_out,
        stats: MergeStats::default(),
    };
    let mut progress = Progress::new("merge", progress_every);

    let mut next_scored = scored.next_row()?;
    let mut next_unscored = unscored.next_row()?;
    let mut pending: Option<(EventId, Origin)> = None;
    let mut rows: Vec<InteractionRow> = Vec::new();

    loop {
        let (origin, row) = match (next_scored, next_unscored) {
            (None, None) => break,
            (Some(a), Some(b)) if a.event_id <= b.event_id => (Origin::Scored, a),
            (Some(a), None) => (Origin::Scored, a),
            (_, Some(b)) => (Origin::Unscored, b),
        };
        match origin {
            Origin::Scored => {
                next_scored = scored.next_row()?;
                flusher.stats.scored_rows += 1;
            }
            Origin::Unscored => {
                next_unscored = unscored.next_row()?;
                flusher.stats.unscored_rows += 1;
            }
        }

        let key = (row.event_id, origin);
        if let Some((event_id, from)) = pending
            && (event_id, from) != key
        {
            flusher.flush(event_id, from, &rows)?;
            rows.clear();
        }
        pending = Some(key);
        rows.push(row);
        progress.tick();
    }

    if let Some((event_id, from)) = pending {
        flusher.flush(event_id, from, &rows)?;
    }
    progress.done();

    let Flusher {
        scored_out,
        unscored_out,
        stats,
        ..
    } = flusher;
    scored_out.finish()?;
    unscored_out.finish()?;
    Ok(stats)
}
