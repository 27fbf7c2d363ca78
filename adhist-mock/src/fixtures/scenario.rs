use adhist_core::{Ad, Annotation, Document, Event, InteractionRow};

use crate::{Dataset, Split};

const UID: u32 = 40;

fn event(event_id: u32) -> Event {
    Event {
        event_id,
        uid: UID,
        document_id: 100,
        timestamp: 1_465_876_799_998 + i64::from(event_id) * 60_000,
        platform: 1,
        location: "US>CA>807".into(),
    }
}

pub fn three_events() -> Dataset {
    Dataset {
        events: (1..=3).map(event).collect(),
        ads: vec![
            Ad {
                ad_id: 1,
                document_id: 100,
                campaign_id: 7,
                advertiser_id: 8,
            },
            Ad {
                ad_id: 2,
                document_id: 200,
                campaign_id: 9,
                advertiser_id: 8,
            },
        ],
        documents: vec![
            Document {
                document_id: 100,
                source_id: 3,
                publisher_id: 4,
            },
            Document {
                document_id: 200,
                source_id: 3,
                publisher_id: 5,
            },
        ],
        categories: vec![
            (100, Annotation { id: 1403, weight: 0.6 }),
            (100, Annotation { id: 1702, weight: 0.4 }),
        ],
        topics: vec![(200, Annotation { id: 16, weight: 0.9 })],
        splits: vec![
            Split {
                name: "train".into(),
                rows: vec![
                    InteractionRow::scored(1, 1, true),
                    InteractionRow::scored(2, 1, false),
                    InteractionRow::scored(3, 2, true),
                ],
            },
            Split {
                name: "test".into(),
                rows: vec![InteractionRow::unscored(3, 1)],
            },
        ],
    }
}
