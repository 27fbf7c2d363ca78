//! Aggregation strategies.
//!
//! Each strategy owns its counter maps and exposes the same four operations, so
//! the engine drives any of them through `dyn AggregationStrategy`:
//! - `group`: the group key alone.
//! - `pair`: two keyed maps updated together (ad/document, publisher/source,
//!   campaign/advertiser).
//! - `weighted`: confidence-weighted document categories or topics.
use std::sync::Arc;

use adhist_types::{AdId, AdhistError, CounterWidth, Dimension, GroupKey, OverflowDirection};

use crate::counter::Sign;
use crate::io::RowSink;
use crate::reference::ReferenceData;

/// Group-only counters.
pub mod group;
/// Two-map counters keyed by ad attributes.
pub mod pair;
/// Annotation-weighted counters.
pub mod weighted;

pub use group::GroupStrategy;
pub use pair::{
    AdDocument, AdStrategy, CampaignAdvertiser, CampaignStrategy, DimensionPair, PairStrategy,
    PublisherSource, SourceStrategy,
};
pub use weighted::{
    AnnotationKind, Categories, CategoryStrategy, Topics, TopicStrategy, WeightedStrategy,
};

/// Per-dimension counting logic driven by the engine.
pub trait AggregationStrategy: Send {
    /// Dimension this strategy counts.
    fn dimension(&self) -> Dimension;

    /// Ordered output column names.
    fn header(&self) -> &'static [&'static str];

    /// Emit the current snapshot for (`group`, `ad_id`) as one row. Never mutates.
    ///
    /// # Errors
    /// Fails on missing reference data or sink write errors.
    fn write(&self, sink: &mut dyn RowSink, group: GroupKey, ad_id: AdId)
    -> Result<(), AdhistError>;

    /// Commit one row into the past counters of every bucket it touches.
    ///
    /// # Errors
    /// Fails on missing reference data or counter overflow; no bucket changes on failure.
    fn update_past(&mut self, group: GroupKey, ad_id: AdId, clicked: bool)
    -> Result<(), AdhistError>;

    /// Add or retract one row in the future counters of every bucket it touches.
    ///
    /// # Errors
    /// Fails on missing reference data or counter overflow; no bucket changes on failure.
    fn update_future(
        &mut self,
        group: GroupKey,
        ad_id: AdId,
        clicked: bool,
        sign: Sign,
    ) -> Result<(), AdhistError>;
}

pub(crate) fn overflow_in(label: &'static str) -> impl Fn(OverflowDirection) -> AdhistError {
    move |direction| AdhistError::overflow(direction, label)
}

/// Instantiate the strategy for `dimension` with counters of `width`.
///
/// # Errors
/// Returns `InvalidConfig` when the width does not suit the dimension: weighted
/// dimensions need `F32`, exact dimensions need an integer width.
pub fn build_strategy(
    dimension: Dimension,
    width: CounterWidth,
    refs: Arc<ReferenceData>,
) -> Result<Box<dyn AggregationStrategy>, AdhistError> {
    macro_rules! exact {
        ($ty:ident) => {
            match width {
                CounterWidth::U8 => Box::new($ty::<u8>::new(refs)) as Box<dyn AggregationStrategy>,
                CounterWidth::U16 => Box::new($ty::<u16>::new(refs)),
                CounterWidth::U32 => Box::new($ty::<u32>::new(refs)),
                CounterWidth::U64 => Box::new($ty::<u64>::new(refs)),
                CounterWidth::I32 => Box::new($ty::<i32>::new(refs)),
                CounterWidth::I64 => Box::new($ty::<i64>::new(refs)),
                CounterWidth::F32 => {
                    return Err(AdhistError::InvalidConfig(format!(
                        "{dimension:?} counters need an integer width"
                    )));
                }
            }
        };
    }

    if dimension.is_weighted() && width != CounterWidth::F32 {
        return Err(AdhistError::InvalidConfig(format!(
            "{dimension:?} counters are weighted and need f32, got {width:?}"
        )));
    }

    let strategy: Box<dyn AggregationStrategy> = match dimension {
        Dimension::Group => exact!(GroupStrategy),
        Dimension::Ad => exact!(AdStrategy),
        Dimension::Source => exact!(SourceStrategy),
        Dimension::Campaign => exact!(CampaignStrategy),
        Dimension::Category => Box::new(CategoryStrategy::new(refs)),
        Dimension::Topic => Box::new(TopicStrategy::new(refs)),
    };
    Ok(strategy)
}
