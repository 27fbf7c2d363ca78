use adhist_core::{Ad, Annotation, Document, Event, InteractionRow};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Dataset, Split};

const ADS: u32 = 24;
const DOCUMENTS: u32 = 10;
const LOCATIONS: [&str; 4] = ["US>CA>807", "US>NY>501", "GB>H9", "CA>ON>535"];
/// Roughly mid-June 2016, in milliseconds.
const START_MS: i64 = 1_465_876_800_000;

pub fn generate(seed: u64, events: u32) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let users = events / 4 + 1;

    let documents = (0..DOCUMENTS)
        .map(|document_id| Document {
            document_id,
            source_id: document_id % 4,
            publisher_id: document_id % 3,
        })
        .collect();
    let ads = (0..ADS)
        .map(|ad_id| Ad {
            ad_id,
            document_id: ad_id % DOCUMENTS,
            campaign_id: ad_id % 6,
            advertiser_id: ad_id % 4,
        })
        .collect();

    let mut categories = Vec::new();
    let mut topics = Vec::new();
    for doc in 0..DOCUMENTS {
        // every third document stays unannotated
        if doc % 3 == 2 {
            continue;
        }
        let first = 0.5 + f32::from(rng.random_range(0..5u8)) / 10.0;
        let (cat_a, cat_b) = (rng.random_range(1000..1008), rng.random_range(2000..2008));
        categories.push((doc, Annotation { id: cat_a, weight: first }));
        categories.push((doc, Annotation { id: cat_b, weight: 1.0 - first }));
        topics.push((doc, Annotation { id: rng.random_range(0..30), weight: 0.8 }));
    }

    let mut event_rows = Vec::new();
    let mut train = Vec::new();
    let mut test = Vec::new();
    let mut ts = START_MS;
    for event_id in 1..=events {
        ts += rng.random_range(0..3_600_000i64);
        event_rows.push(Event {
            event_id,
            uid: rng.random_range(0..users),
            document_id: rng.random_range(0..DOCUMENTS),
            timestamp: ts,
            platform: rng.random_range(1..=3),
            location: LOCATIONS[rng.random_range(0..LOCATIONS.len())].to_string(),
        });

        let shown = rng.random_range(2..5u32);
        let clicked = rng.random_range(0..shown);
        let first_ad = rng.random_range(0..ADS);
        for slot in 0..shown {
            let ad_id = (first_ad + slot * 5) % ADS;
            if event_id % 3 == 0 {
                test.push(InteractionRow::unscored(event_id, ad_id));
            } else {
                train.push(InteractionRow::scored(event_id, ad_id, slot == clicked));
            }
        }
    }

    Dataset {
        events: event_rows,
        ads,
        documents,
        categories,
        topics,
        splits: vec![
            Split {
                name: "train".into(),
                rows: train,
            },
            Split {
                name: "test".into(),
                rows: test,
            },
        ],
    }
}
