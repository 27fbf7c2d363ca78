use std::sync::Arc;

use adhist_types::{AdId, AdhistError, Dimension, GroupKey};

use super::{AggregationStrategy, overflow_in};
use crate::counter::{CounterStore, CounterValue, Sign};
use crate::io::RowSink;
use crate::reference::ReferenceData;

const HEADER: &[&str] = &[
    "grp_past_views",
    "grp_past_clicks",
    "grp_future_views",
    "grp_future_clicks",
];

/// Counts interactions per group, regardless of the ad shown.
#[derive(Debug, Clone)]
pub struct GroupStrategy<C> {
    counts: CounterStore<GroupKey, C>,
}

impl<C: CounterValue> GroupStrategy<C> {
    /// Empty strategy. Reference data is unused but accepted for a uniform constructor.
    #[must_use]
    pub fn new(_refs: Arc<ReferenceData>) -> Self {
        Self {
            counts: CounterStore::new("grp"),
        }
    }
}

impl<C: CounterValue> AggregationStrategy for GroupStrategy<C> {
    fn dimension(&self) -> Dimension {
        Dimension::Group
    }

    fn header(&self) -> &'static [&'static str] {
        HEADER
    }

    fn write(
        &self,
        sink: &mut dyn RowSink,
        group: GroupKey,
        _ad_id: AdId,
    ) -> Result<(), AdhistError> {
        sink.write_row(&self.counts.get(&group).values())
    }

    fn update_past(
        &mut self,
        group: GroupKey,
        _ad_id: AdId,
        clicked: bool,
    ) -> Result<(), AdhistError> {
        let next = self
            .counts
            .get(&group)
            .increment_past(clicked)
            .map_err(overflow_in(self.counts.label()))?;
        self.counts.set(group, next);
        Ok(())
    }

    fn update_future(
        &mut self,
        group: GroupKey,
        _ad_id: AdId,
        clicked: bool,
        sign: Sign,
    ) -> Result<(), AdhistError> {
        let next = self
            .counts
            .get(&group)
            .apply_future(sign, clicked)
            .map_err(overflow_in(self.counts.label()))?;
        self.counts.set(group, next);
        Ok(())
    }
}
