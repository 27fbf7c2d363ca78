//! Deterministic datasets and scripted sources/sinks for adhist tests and demos.
//!
//! A [`Dataset`] bundles reference tables with named interaction splits. It can
//! be consumed in memory ([`Dataset::reference_data`], [`Dataset::source`]) or
//! written out as the gzip CSV tree the batch job reads
//! ([`Dataset::write_to_dir`]).
#![warn(missing_docs)]

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use adhist_core::{
    Ad, AdhistConfig, AdhistError, Annotation, DataSplit, Document, DocumentId, Event,
    InteractionRow, ReferenceData, ReferencePaths, SplitPair, VecRowSource,
};
use flate2::Compression;
use flate2::write::GzEncoder;

mod behavior;
mod fixtures;

pub use behavior::{FailingSink, FailingSource, SinkBehavior};

/// One named interaction log.
#[derive(Debug, Clone, PartialEq)]
pub struct Split {
    /// Split name, used in output file names.
    pub name: String,
    /// Rows sorted by event id.
    pub rows: Vec<InteractionRow>,
}

impl Split {
    /// Whether every row carries a click label.
    #[must_use]
    pub fn is_scored(&self) -> bool {
        self.rows.iter().all(|r| r.clicked.is_some())
    }
}

/// Reference tables plus interaction splits.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Events in id order.
    pub events: Vec<Event>,
    /// Ads with their landing documents.
    pub ads: Vec<Ad>,
    /// Landing documents.
    pub documents: Vec<Document>,
    /// (document, category annotation) pairs.
    pub categories: Vec<(DocumentId, Annotation)>,
    /// (document, topic annotation) pairs.
    pub topics: Vec<(DocumentId, Annotation)>,
    /// Splits in (scored, unscored) pairs.
    pub splits: Vec<Split>,
}

impl Dataset {
    /// Three events of one user: two scored views of ad 1 and a scored click
    /// on ad 2, plus one unscored row of ad 1 at the last event.
    #[must_use]
    pub fn three_events() -> Self {
        fixtures::scenario::three_events()
    }

    /// Pseudo-random but reproducible dataset over `events` events.
    ///
    /// Every third event goes to an unscored `test` split, the rest to a scored
    /// `train` split; every scored event has exactly one clicked ad.
    #[must_use]
    pub fn synthetic(seed: u64, events: u32) -> Self {
        fixtures::synthetic::generate(seed, events)
    }

    /// Indexed reference tables.
    #[must_use]
    pub fn reference_data(&self) -> ReferenceData {
        let mut b = ReferenceData::builder();
        for e in &self.events {
            b.push_event(e.clone());
        }
        for a in &self.ads {
            b.push_ad(*a);
        }
        for d in &self.documents {
            b.push_document(*d);
        }
        for (doc, ann) in &self.categories {
            b.push_category(*doc, *ann);
        }
        for (doc, ann) in &self.topics {
            b.push_topic(*doc, *ann);
        }
        b.build()
    }

    /// Split by name.
    #[must_use]
    pub fn split(&self, name: &str) -> Option<&Split> {
        self.splits.iter().find(|s| s.name == name)
    }

    /// In-memory source over the named split (empty if unknown).
    #[must_use]
    pub fn source(&self, name: &str) -> VecRowSource {
        self.split(name)
            .map(|s| VecRowSource::new(s.rows.iter().copied()))
            .unwrap_or_default()
    }

    /// Write every table and split as gzip CSV under `dir` and return a config
    /// pointing at them, with outputs going to `dir/out`.
    ///
    /// # Errors
    /// Returns `Io` or `Csv` when a file cannot be written.
    pub fn write_to_dir(&self, dir: &Path) -> Result<AdhistConfig, AdhistError> {
        let reference = ReferencePaths {
            events: dir.join("events.csv.gz"),
            ads: dir.join("ads.csv.gz"),
            documents: dir.join("documents.csv.gz"),
            categories: dir.join("documents_categories.csv.gz"),
            topics: dir.join("documents_topics.csv.gz"),
        };

        write_gz(
            &reference.events,
            &["event_id", "uid", "document_id", "timestamp", "platform", "location"],
            self.events.iter().map(|e| {
                vec![
                    e.event_id.to_string(),
                    e.uid.to_string(),
                    e.document_id.to_string(),
                    e.timestamp.to_string(),
                    e.platform.to_string(),
                    e.location.clone(),
                ]
            }),
        )?;
        write_gz(
            &reference.ads,
            &["ad_id", "document_id", "campaign_id", "advertiser_id"],
            self.ads.iter().map(|a| {
                vec![
                    a.ad_id.to_string(),
                    a.document_id.to_string(),
                    a.campaign_id.to_string(),
                    a.advertiser_id.to_string(),
                ]
            }),
        )?;
        write_gz(
            &reference.documents,
            &["document_id", "source_id", "publisher_id"],
            self.documents.iter().map(|d| {
                vec![
                    d.document_id.to_string(),
                    d.source_id.to_string(),
                    d.publisher_id.to_string(),
                ]
            }),
        )?;
        for (path, table) in [
            (&reference.categories, &self.categories),
            (&reference.topics, &self.topics),
        ] {
            write_gz(
                path,
                &["document_id", "annotation_id", "confidence"],
                table.iter().map(|(doc, ann)| {
                    vec![doc.to_string(), ann.id.to_string(), ann.weight.to_string()]
                }),
            )?;
        }

        let mut split_paths = Vec::with_capacity(self.splits.len());
        for split in &self.splits {
            let path = dir.join(format!("clicks_{}.csv.gz", split.name));
            let scored = split.is_scored();
            let header: &[&str] = if scored {
                &["event_id", "ad_id", "clicked"]
            } else {
                &["event_id", "ad_id"]
            };
            write_gz(
                &path,
                header,
                split.rows.iter().map(|r| {
                    let mut rec = vec![r.event_id.to_string(), r.ad_id.to_string()];
                    if let Some(c) = r.clicked {
                        rec.push(u8::from(c).to_string());
                    }
                    rec
                }),
            )?;
            split_paths.push(DataSplit::new(split.name.clone(), path));
        }

        let mut split_pairs = Vec::new();
        let mut paths = split_paths.into_iter();
        while let (Some(scored), Some(unscored)) = (paths.next(), paths.next()) {
            split_pairs.push(SplitPair { scored, unscored });
        }

        Ok(AdhistConfig {
            reference,
            split_pairs,
            output_dir: dir.join("out"),
            ..AdhistConfig::default()
        })
    }
}

fn write_gz(
    path: &Path,
    header: &[&str],
    records: impl Iterator<Item = Vec<String>>,
) -> Result<(), AdhistError> {
    let file = File::create(path).map_err(|e| AdhistError::io(path, &e))?;
    let gz = GzEncoder::new(BufWriter::new(file), Compression::fast());
    let mut wtr = csv::Writer::from_writer(gz);
    let csv_err = |e: csv::Error| AdhistError::Csv(e.to_string());
    wtr.write_record(header).map_err(csv_err)?;
    for rec in records {
        wtr.write_record(&rec).map_err(csv_err)?;
    }
    let gz = wtr
        .into_inner()
        .map_err(|e| AdhistError::io(path, e.error()))?;
    gz.finish().map_err(|e| AdhistError::io(path, &e))?;
    Ok(())
}
