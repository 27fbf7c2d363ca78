use std::collections::HashMap;

use adhist_types::{Ad, AdId, AdhistError, Annotation, Document, DocumentId, Event, EventId};

/// Weighted many-to-many relation from documents to category or topic ids.
#[derive(Debug, Clone, Default)]
pub struct AnnotationTable {
    by_document: HashMap<DocumentId, Vec<Annotation>>,
}

impl AnnotationTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an annotation to `document_id`, keeping insertion order.
    pub fn insert(&mut self, document_id: DocumentId, annotation: Annotation) {
        self.by_document
            .entry(document_id)
            .or_default()
            .push(annotation);
    }

    /// All annotations of `document_id`; empty when the document has none.
    #[must_use]
    pub fn for_document(&self, document_id: DocumentId) -> &[Annotation] {
        self.by_document
            .get(&document_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of annotated documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_document.len()
    }

    /// Whether no document is annotated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_document.is_empty()
    }
}

/// Immutable reference snapshot shared by every run of one process.
///
/// Events and ads are indexed by their dense integer ids; lookups of absent ids
/// are fatal `MissingReference` errors.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    events: Vec<Option<Event>>,
    ads: Vec<Option<Ad>>,
    documents: HashMap<DocumentId, Document>,
    categories: AnnotationTable,
    topics: AnnotationTable,
}

impl ReferenceData {
    /// Start building a snapshot.
    #[must_use]
    pub fn builder() -> ReferenceDataBuilder {
        ReferenceDataBuilder::default()
    }

    /// Event by id.
    ///
    /// # Errors
    /// Returns `MissingReference` if the id was never loaded.
    pub fn event(&self, event_id: EventId) -> Result<&Event, AdhistError> {
        lookup_dense(&self.events, event_id)
            .ok_or_else(|| AdhistError::missing("event", event_id))
    }

    /// Ad by id.
    ///
    /// # Errors
    /// Returns `MissingReference` if the id was never loaded.
    pub fn ad(&self, ad_id: AdId) -> Result<&Ad, AdhistError> {
        lookup_dense(&self.ads, ad_id).ok_or_else(|| AdhistError::missing("ad", ad_id))
    }

    /// Document by id.
    ///
    /// # Errors
    /// Returns `MissingReference` if the id was never loaded.
    pub fn document(&self, document_id: DocumentId) -> Result<&Document, AdhistError> {
        self.documents
            .get(&document_id)
            .ok_or_else(|| AdhistError::missing("document", document_id))
    }

    /// Landing document of an ad.
    ///
    /// # Errors
    /// Returns `MissingReference` if the ad is unknown.
    pub fn ad_document_id(&self, ad_id: AdId) -> Result<DocumentId, AdhistError> {
        Ok(self.ad(ad_id)?.document_id)
    }

    /// Category annotations of a document.
    #[must_use]
    pub fn categories(&self, document_id: DocumentId) -> &[Annotation] {
        self.categories.for_document(document_id)
    }

    /// Topic annotations of a document.
    #[must_use]
    pub fn topics(&self, document_id: DocumentId) -> &[Annotation] {
        self.topics.for_document(document_id)
    }

    /// Loaded table sizes: (events, ads, documents, categorized docs, topical docs).
    #[must_use]
    pub fn sizes(&self) -> (usize, usize, usize, usize, usize) {
        (
            self.events.iter().flatten().count(),
            self.ads.iter().flatten().count(),
            self.documents.len(),
            self.categories.len(),
            self.topics.len(),
        )
    }
}

fn lookup_dense<T>(table: &[Option<T>], id: u32) -> Option<&T> {
    let idx = usize::try_from(id).ok()?;
    table.get(idx)?.as_ref()
}

fn insert_dense<T>(table: &mut Vec<Option<T>>, id: u32, value: T) {
    let Ok(idx) = usize::try_from(id) else {
        return;
    };
    if table.len() <= idx {
        table.resize_with(idx + 1, || None);
    }
    table[idx] = Some(value);
}

/// Builder for [`ReferenceData`], used by loaders and tests alike.
#[derive(Debug, Default)]
pub struct ReferenceDataBuilder {
    data: ReferenceData,
}

impl ReferenceDataBuilder {
    /// Register an event; a later event with the same id replaces it.
    #[must_use]
    pub fn event(mut self, event: Event) -> Self {
        self.push_event(event);
        self
    }

    /// Register an ad.
    #[must_use]
    pub fn ad(mut self, ad: Ad) -> Self {
        self.push_ad(ad);
        self
    }

    /// Register a document.
    #[must_use]
    pub fn document(mut self, document: Document) -> Self {
        self.push_document(document);
        self
    }

    /// Register a category annotation.
    #[must_use]
    pub fn category(mut self, document_id: DocumentId, id: u32, weight: f32) -> Self {
        self.push_category(document_id, Annotation { id, weight });
        self
    }

    /// Register a topic annotation.
    #[must_use]
    pub fn topic(mut self, document_id: DocumentId, id: u32, weight: f32) -> Self {
        self.push_topic(document_id, Annotation { id, weight });
        self
    }

    /// In-place variant of [`Self::event`] for streaming loaders.
    pub fn push_event(&mut self, event: Event) {
        insert_dense(&mut self.data.events, event.event_id, event);
    }

    /// In-place variant of [`Self::ad`].
    pub fn push_ad(&mut self, ad: Ad) {
        insert_dense(&mut self.data.ads, ad.ad_id, ad);
    }

    /// In-place variant of [`Self::document`].
    pub fn push_document(&mut self, document: Document) {
        self.data.documents.insert(document.document_id, document);
    }

    /// In-place variant of [`Self::category`].
    pub fn push_category(&mut self, document_id: DocumentId, annotation: Annotation) {
        self.data.categories.insert(document_id, annotation);
    }

    /// In-place variant of [`Self::topic`].
    pub fn push_topic(&mut self, document_id: DocumentId, annotation: Annotation) {
        self.data.topics.insert(document_id, annotation);
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> ReferenceData {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_ids_are_missing_not_default() {
        let refs = ReferenceData::builder()
            .ad(Ad {
                ad_id: 5,
                document_id: 50,
                campaign_id: 1,
                advertiser_id: 2,
            })
            .build();
        assert_eq!(refs.ad_document_id(5).unwrap(), 50);
        assert_eq!(refs.ad(3).unwrap_err(), AdhistError::missing("ad", 3u32));
        assert!(refs.ad(500).is_err());
        assert!(refs.document(50).is_err());
    }

    #[test]
    fn annotations_keep_insertion_order_and_default_to_empty() {
        let refs = ReferenceData::builder()
            .category(7, 100, 0.6)
            .category(7, 200, 0.4)
            .build();
        let ids: Vec<u32> = refs.categories(7).iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![100, 200]);
        assert!(refs.categories(8).is_empty());
        assert!(refs.topics(7).is_empty());
    }
}
