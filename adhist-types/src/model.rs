//! Reference-data records and id aliases.

use serde::{Deserialize, Serialize};

/// Display/event identifier; both interaction streams are sorted by it.
pub type EventId = u32;
/// Ad identifier.
pub type AdId = u32;
/// Document identifier.
pub type DocumentId = u32;
/// Partition key produced by a grouping extractor.
pub type GroupKey = u32;

/// A page view during which one or more ads were displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Event id.
    pub event_id: EventId,
    /// User identifier (dense integer).
    pub uid: u32,
    /// Document the user was reading.
    pub document_id: DocumentId,
    /// Milliseconds since the dataset epoch.
    pub timestamp: i64,
    /// Platform code (desktop, mobile, tablet, ...).
    pub platform: i32,
    /// Geo-location string such as `US>CA>807`.
    pub location: String,
}

/// A promoted piece of content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ad {
    /// Ad id.
    pub ad_id: AdId,
    /// Landing document.
    pub document_id: DocumentId,
    /// Campaign the ad belongs to.
    pub campaign_id: u32,
    /// Advertiser running the campaign.
    pub advertiser_id: u32,
}

/// Document metadata relevant to source-level counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Document id.
    pub document_id: DocumentId,
    /// Source (site section) id.
    pub source_id: u32,
    /// Publisher id.
    pub publisher_id: u32,
}

/// One weighted category or topic assignment of a document.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Category or topic id.
    pub id: u32,
    /// Confidence in `[0, 1]`.
    pub weight: f32,
}
