use std::marker::PhantomData;
use std::sync::Arc;

use adhist_types::{AdId, AdhistError, Annotation, Dimension, DocumentId, GroupKey};

use super::AggregationStrategy;
use crate::counter::{CounterStore, Sign};
use crate::io::{FeatureValue, RowSink};
use crate::reference::ReferenceData;

/// Which annotation table of a document a weighted strategy reads.
pub trait AnnotationKind: Send + 'static {
    /// Dimension tag.
    const DIMENSION: Dimension;
    /// Output columns.
    const HEADER: &'static [&'static str];
    /// Counter map label.
    const LABEL: &'static str;

    /// Annotations of `document_id`.
    fn annotations(refs: &ReferenceData, document_id: DocumentId) -> &[Annotation];
}

/// Document categories.
#[derive(Debug, Clone, Copy)]
pub struct Categories;

impl AnnotationKind for Categories {
    const DIMENSION: Dimension = Dimension::Category;
    const HEADER: &'static [&'static str] = &[
        "cat_past_views",
        "cat_past_clicks",
        "cat_future_views",
        "cat_future_clicks",
    ];
    const LABEL: &'static str = "cat";

    fn annotations(refs: &ReferenceData, document_id: DocumentId) -> &[Annotation] {
        refs.categories(document_id)
    }
}

/// Document topics.
#[derive(Debug, Clone, Copy)]
pub struct Topics;

impl AnnotationKind for Topics {
    const DIMENSION: Dimension = Dimension::Topic;
    const HEADER: &'static [&'static str] = &[
        "top_past_views",
        "top_past_clicks",
        "top_future_views",
        "top_future_clicks",
    ];
    const LABEL: &'static str = "top";

    fn annotations(refs: &ReferenceData, document_id: DocumentId) -> &[Annotation] {
        refs.topics(document_id)
    }
}

/// One `f32` bucket per (group, annotation id), fed with confidence-weighted rows.
///
/// A row touches every annotation of the ad's landing document; `write` reports
/// the confidence-weighted sum of those buckets. Documents without annotations
/// produce all-zero rows.
#[derive(Debug)]
pub struct WeightedStrategy<A> {
    refs: Arc<ReferenceData>,
    counts: CounterStore<(GroupKey, u32), f32>,
    _kind: PhantomData<fn() -> A>,
}

/// Category counters.
pub type CategoryStrategy = WeightedStrategy<Categories>;
/// Topic counters.
pub type TopicStrategy = WeightedStrategy<Topics>;

impl<A: AnnotationKind> WeightedStrategy<A> {
    /// Empty strategy over `refs`.
    #[must_use]
    pub fn new(refs: Arc<ReferenceData>) -> Self {
        Self {
            refs,
            counts: CounterStore::new(A::LABEL),
            _kind: PhantomData,
        }
    }
}

impl<A: AnnotationKind> AggregationStrategy for WeightedStrategy<A> {
    fn dimension(&self) -> Dimension {
        A::DIMENSION
    }

    fn header(&self) -> &'static [&'static str] {
        A::HEADER
    }

    fn write(
        &self,
        sink: &mut dyn RowSink,
        group: GroupKey,
        ad_id: AdId,
    ) -> Result<(), AdhistError> {
        let doc = self.refs.ad_document_id(ad_id)?;
        let mut sums = [0.0_f32; 4];
        for ann in A::annotations(&self.refs, doc) {
            let c = self.counts.get(&(group, ann.id));
            sums[0] += c.past * ann.weight;
            sums[1] += c.past_pos * ann.weight;
            sums[2] += c.future * ann.weight;
            sums[3] += c.future_pos * ann.weight;
        }
        sink.write_row(&sums.map(FeatureValue::Weight))
    }

    fn update_past(
        &mut self,
        group: GroupKey,
        ad_id: AdId,
        clicked: bool,
    ) -> Result<(), AdhistError> {
        let doc = self.refs.ad_document_id(ad_id)?;
        for ann in A::annotations(&self.refs, doc) {
            self.counts
                .entry((group, ann.id))
                .add_past_weighted(ann.weight, clicked);
        }
        Ok(())
    }

    fn update_future(
        &mut self,
        group: GroupKey,
        ad_id: AdId,
        clicked: bool,
        sign: Sign,
    ) -> Result<(), AdhistError> {
        let doc = self.refs.ad_document_id(ad_id)?;
        for ann in A::annotations(&self.refs, doc) {
            self.counts
                .entry((group, ann.id))
                .add_future_weighted(ann.weight, sign, clicked);
        }
        Ok(())
    }
}
