use std::marker::PhantomData;
use std::sync::Arc;

use adhist_types::{AdId, AdhistError, Dimension, GroupKey, OverflowDirection};

use super::{AggregationStrategy, overflow_in};
use crate::counter::{CounterStore, CounterValue, Counts, Sign};
use crate::io::{FeatureValue, RowSink};
use crate::reference::ReferenceData;

/// Two dimension keys derived from an ad, counted in two independent maps.
pub trait DimensionPair: Send + 'static {
    /// Dimension tag.
    const DIMENSION: Dimension;
    /// Output columns: both past pairs, then both future pairs.
    const HEADER: &'static [&'static str];
    /// Labels of the two maps, used in overflow errors.
    const LABELS: [&'static str; 2];

    /// The (first, second) dimension keys of `ad_id`.
    ///
    /// # Errors
    /// Returns `MissingReference` when the ad or its document is unknown.
    fn keys(refs: &ReferenceData, ad_id: AdId) -> Result<(u32, u32), AdhistError>;
}

/// The ad itself and its landing document.
#[derive(Debug, Clone, Copy)]
pub struct AdDocument;

impl DimensionPair for AdDocument {
    const DIMENSION: Dimension = Dimension::Ad;
    const HEADER: &'static [&'static str] = &[
        "ad_past_views",
        "ad_past_clicks",
        "ad_doc_past_views",
        "ad_doc_past_clicks",
        "ad_future_views",
        "ad_future_clicks",
        "ad_doc_future_views",
        "ad_doc_future_clicks",
    ];
    const LABELS: [&'static str; 2] = ["ad", "ad_doc"];

    fn keys(refs: &ReferenceData, ad_id: AdId) -> Result<(u32, u32), AdhistError> {
        Ok((ad_id, refs.ad_document_id(ad_id)?))
    }
}

/// Publisher and source of the ad's landing document.
#[derive(Debug, Clone, Copy)]
pub struct PublisherSource;

impl DimensionPair for PublisherSource {
    const DIMENSION: Dimension = Dimension::Source;
    const HEADER: &'static [&'static str] = &[
        "pub_past_views",
        "pub_past_clicks",
        "src_past_views",
        "src_past_clicks",
        "pub_future_views",
        "pub_future_clicks",
        "src_future_views",
        "src_future_clicks",
    ];
    const LABELS: [&'static str; 2] = ["pub", "src"];

    fn keys(refs: &ReferenceData, ad_id: AdId) -> Result<(u32, u32), AdhistError> {
        let doc = refs.document(refs.ad_document_id(ad_id)?)?;
        Ok((doc.publisher_id, doc.source_id))
    }
}

/// Campaign and advertiser of the ad.
#[derive(Debug, Clone, Copy)]
pub struct CampaignAdvertiser;

impl DimensionPair for CampaignAdvertiser {
    const DIMENSION: Dimension = Dimension::Campaign;
    const HEADER: &'static [&'static str] = &[
        "past_cmp_views",
        "past_cmp_clicks",
        "past_adv_views",
        "past_adv_clicks",
        "future_cmp_views",
        "future_cmp_clicks",
        "future_adv_views",
        "future_adv_clicks",
    ];
    const LABELS: [&'static str; 2] = ["cmp", "adv"];

    fn keys(refs: &ReferenceData, ad_id: AdId) -> Result<(u32, u32), AdhistError> {
        let ad = refs.ad(ad_id)?;
        Ok((ad.campaign_id, ad.advertiser_id))
    }
}

/// Counts per (group, first key) and per (group, second key).
///
/// Both buckets are validated before either is stored, so an overflow in one
/// map leaves the other untouched.
#[derive(Debug)]
pub struct PairStrategy<D, C> {
    refs: Arc<ReferenceData>,
    first: CounterStore<(GroupKey, u32), C>,
    second: CounterStore<(GroupKey, u32), C>,
    _pair: PhantomData<fn() -> D>,
}

/// Ad and ad-document counters.
pub type AdStrategy<C> = PairStrategy<AdDocument, C>;
/// Publisher and source counters.
pub type SourceStrategy<C> = PairStrategy<PublisherSource, C>;
/// Campaign and advertiser counters.
pub type CampaignStrategy<C> = PairStrategy<CampaignAdvertiser, C>;

impl<D: DimensionPair, C: CounterValue> PairStrategy<D, C> {
    /// Empty strategy over `refs`.
    #[must_use]
    pub fn new(refs: Arc<ReferenceData>) -> Self {
        Self {
            refs,
            first: CounterStore::new(D::LABELS[0]),
            second: CounterStore::new(D::LABELS[1]),
            _pair: PhantomData,
        }
    }

    fn update_both(
        &mut self,
        group: GroupKey,
        ad_id: AdId,
        step: impl Fn(Counts<C>) -> Result<Counts<C>, OverflowDirection>,
    ) -> Result<(), AdhistError> {
        let (k1, k2) = D::keys(&self.refs, ad_id)?;
        let first = step(self.first.get(&(group, k1))).map_err(overflow_in(D::LABELS[0]))?;
        let second = step(self.second.get(&(group, k2))).map_err(overflow_in(D::LABELS[1]))?;
        self.first.set((group, k1), first);
        self.second.set((group, k2), second);
        Ok(())
    }
}

impl<D: DimensionPair, C: CounterValue> AggregationStrategy for PairStrategy<D, C> {
    fn dimension(&self) -> Dimension {
        D::DIMENSION
    }

    fn header(&self) -> &'static [&'static str] {
        D::HEADER
    }

    fn write(
        &self,
        sink: &mut dyn RowSink,
        group: GroupKey,
        ad_id: AdId,
    ) -> Result<(), AdhistError> {
        let (k1, k2) = D::keys(&self.refs, ad_id)?;
        let [p1, pp1, f1, fp1] = self.first.get(&(group, k1)).values();
        let [p2, pp2, f2, fp2] = self.second.get(&(group, k2)).values();
        let row: [FeatureValue; 8] = [p1, pp1, p2, pp2, f1, fp1, f2, fp2];
        sink.write_row(&row)
    }

    fn update_past(
        &mut self,
        group: GroupKey,
        ad_id: AdId,
        clicked: bool,
    ) -> Result<(), AdhistError> {
        self.update_both(group, ad_id, |c| c.increment_past(clicked))
    }

    fn update_future(
        &mut self,
        group: GroupKey,
        ad_id: AdId,
        clicked: bool,
        sign: Sign,
    ) -> Result<(), AdhistError> {
        self.update_both(group, ad_id, |c| c.apply_future(sign, clicked))
    }
}
