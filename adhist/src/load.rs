use std::path::Path;

use adhist_core::io::parse_num;
use adhist_core::{Ad, AdhistError, Annotation, Document, Event, ReferenceData, ReferencePaths};
use csv::StringRecord;

use crate::io::{csv_err, open_gz_csv};

/// Stream every record of a gzip CSV file (header skipped) through `f`.
fn for_each_record(
    path: &Path,
    buffer: usize,
    mut f: impl FnMut(&StringRecord) -> Result<(), AdhistError>,
) -> Result<(), AdhistError> {
    let mut reader = open_gz_csv(path, buffer)?;
    let mut record = StringRecord::new();
    while reader.read_record(&mut record).map_err(csv_err(path))? {
        f(&record)?;
    }
    Ok(())
}

fn field<'r>(record: &'r StringRecord, idx: usize, name: &str) -> Result<&'r str, AdhistError> {
    record
        .get(idx)
        .map(str::trim)
        .ok_or_else(|| AdhistError::parse(name, ""))
}

fn num<T: std::str::FromStr>(
    record: &StringRecord,
    idx: usize,
    name: &str,
) -> Result<T, AdhistError> {
    parse_num(field(record, idx, name)?, name)
}

fn annotation(record: &StringRecord) -> Result<(u32, Annotation), AdhistError> {
    Ok((
        num(record, 0, "document_id")?,
        Annotation {
            id: num(record, 1, "annotation_id")?,
            weight: num(record, 2, "confidence")?,
        },
    ))
}

/// Load the five reference tables into memory.
///
/// Column layouts (each file has a header row):
/// - events: `event_id,uid,document_id,timestamp,platform,location`
/// - ads: `ad_id,document_id,campaign_id,advertiser_id`
/// - documents: `document_id,source_id,publisher_id`
/// - categories, topics: `document_id,annotation_id,confidence`
///
/// # Errors
/// Returns the first `Io`, `Csv`, or `Parse` error encountered.
#[cfg_attr(
    feature = "tracing",
    tracing::instrument(name = "adhist::load::load_reference", skip(paths))
)]
pub fn load_reference(
    paths: &ReferencePaths,
    buffer: usize,
) -> Result<ReferenceData, AdhistError> {
    let mut b = ReferenceData::builder();

    for_each_record(&paths.events, buffer, |r| {
        b.push_event(Event {
            event_id: num(r, 0, "event_id")?,
            uid: num(r, 1, "uid")?,
            document_id: num(r, 2, "document_id")?,
            timestamp: num(r, 3, "timestamp")?,
            platform: num(r, 4, "platform")?,
            location: field(r, 5, "location")?.to_string(),
        });
        Ok(())
    })?;
    for_each_record(&paths.ads, buffer, |r| {
        b.push_ad(Ad {
            ad_id: num(r, 0, "ad_id")?,
            document_id: num(r, 1, "document_id")?,
            campaign_id: num(r, 2, "campaign_id")?,
            advertiser_id: num(r, 3, "advertiser_id")?,
        });
        Ok(())
    })?;
    for_each_record(&paths.documents, buffer, |r| {
        b.push_document(Document {
            document_id: num(r, 0, "document_id")?,
            source_id: num(r, 1, "source_id")?,
            publisher_id: num(r, 2, "publisher_id")?,
        });
        Ok(())
    })?;
    for_each_record(&paths.categories, buffer, |r| {
        let (doc, ann) = annotation(r)?;
        b.push_category(doc, ann);
        Ok(())
    })?;
    for_each_record(&paths.topics, buffer, |r| {
        let (doc, ann) = annotation(r)?;
        b.push_topic(doc, ann);
        Ok(())
    })?;

    let refs = b.build();
    #[cfg(feature = "tracing")]
    {
        let (events, ads, documents, categorized, topical) = refs.sizes();
        tracing::info!(events, ads, documents, categorized, topical, "reference data loaded");
    }
    Ok(refs)
}
