//! Feature-set descriptors: which grouping, which dimension, which counter width.

use serde::{Deserialize, Serialize};

/// How interaction events are partitioned before counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    /// Partition by the event's user id.
    Uid,
    /// Partition by time-of-week bucket, platform, and location prefix.
    Context,
}

/// The reference attribute(s) a feature set counts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    /// The group key alone.
    Group,
    /// Ad and its landing document.
    Ad,
    /// Publisher and source of the landing document.
    Source,
    /// Campaign and advertiser.
    Campaign,
    /// Confidence-weighted document categories.
    Category,
    /// Confidence-weighted document topics.
    Topic,
}

impl Dimension {
    /// Whether this dimension accumulates fractional, annotation-weighted counts.
    #[must_use]
    pub const fn is_weighted(self) -> bool {
        matches!(self, Self::Category | Self::Topic)
    }
}

/// Storage width of exact-count counters.
///
/// Weighted dimensions always use `F32` and ignore integer widths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterWidth {
    /// 8-bit unsigned.
    U8,
    /// 16-bit unsigned.
    U16,
    /// 32-bit unsigned.
    U32,
    /// 64-bit unsigned.
    U64,
    /// 32-bit signed.
    I32,
    /// 64-bit signed.
    I64,
    /// Single-precision float, for weighted dimensions.
    F32,
}

/// One named feature set: the unit that produces a `<name>_<split>.csv.gz` file per split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// File name prefix, e.g. `uid_viewed_ads`.
    pub name: String,
    /// Grouping extractor.
    pub grouping: Grouping,
    /// Counted dimension.
    pub dimension: Dimension,
    /// Counter width.
    pub counter: CounterWidth,
}

impl FeatureSet {
    /// Build a feature set descriptor.
    pub fn new(
        name: impl Into<String>,
        grouping: Grouping,
        dimension: Dimension,
        counter: CounterWidth,
    ) -> Self {
        Self {
            name: name.into(),
            grouping,
            dimension,
            counter,
        }
    }

    /// The eleven feature sets produced by the reference job.
    #[must_use]
    pub fn default_plan() -> Vec<Self> {
        use CounterWidth::{F32, U8, U16, U32};
        use Dimension::{Ad, Campaign, Category, Group, Source, Topic};
        use Grouping::{Context, Uid};

        vec![
            Self::new("uid_viewed_grps", Uid, Group, U16),
            Self::new("uid_viewed_ads", Uid, Ad, U8),
            Self::new("uid_viewed_ad_srcs", Uid, Source, U8),
            Self::new("uid_viewed_ad_cmps", Uid, Campaign, U8),
            Self::new("uid_viewed_ad_cats", Uid, Category, F32),
            Self::new("uid_viewed_ad_tops", Uid, Topic, F32),
            Self::new("g2_viewed_ads", Context, Ad, U32),
            Self::new("g2_viewed_ad_srcs", Context, Source, U32),
            Self::new("g2_viewed_ad_cmps", Context, Campaign, U32),
            Self::new("g2_viewed_ad_cats", Context, Category, F32),
            Self::new("g2_viewed_ad_tops", Context, Topic, F32),
        ]
    }
}
