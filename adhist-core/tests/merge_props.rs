use std::sync::Arc;

use adhist_core::strategy::AdStrategy;
use adhist_core::{
    Ad, Document, Event, FeatureValue, InteractionRow, MemorySink, ReferenceData, UidExtractor,
    VecRowSource, merge_join, seed_future,
};
use proptest::prelude::*;

const EVENTS: u32 = 12;
const ADS: u32 = 4;

fn refs(uids: &[u32]) -> ReferenceData {
    let mut b = ReferenceData::builder();
    for (i, uid) in uids.iter().enumerate() {
        let event_id = u32::try_from(i).unwrap() + 1;
        b.push_event(Event {
            event_id,
            uid: *uid,
            document_id: 1,
            timestamp: 0,
            platform: 1,
            location: String::new(),
        });
    }
    for ad_id in 0..ADS {
        b.push_ad(Ad {
            ad_id,
            document_id: ad_id % 2,
            campaign_id: 0,
            advertiser_id: 0,
        });
    }
    for document_id in 0..2 {
        b.push_document(Document {
            document_id,
            source_id: 0,
            publisher_id: 0,
        });
    }
    b.build()
}

fn arb_stream(scored: bool) -> impl Strategy<Value = Vec<InteractionRow>> {
    proptest::collection::vec((1..=EVENTS, 0..ADS, any::<bool>()), 0..40).prop_map(move |rows| {
        let mut rows: Vec<_> = rows
            .into_iter()
            .map(|(event_id, ad_id, clicked)| {
                if scored {
                    InteractionRow::scored(event_id, ad_id, clicked)
                } else {
                    InteractionRow::unscored(event_id, ad_id)
                }
            })
            .collect();
        rows.sort_by_key(|r| r.event_id);
        rows
    })
}

fn column(sink: &MemorySink, column: &str) -> Vec<u64> {
    (0..sink.rows.len())
        .map(|i| match sink.cell(i, column) {
            Some(FeatureValue::Unsigned(v)) => v,
            other => panic!("{column}: {other:?}"),
        })
        .collect()
}

/// Brute-force (past views, past clicks, future views, future clicks) of a row
/// at `event_id`, given whether the scored rows of that event already moved.
fn expected(
    scored: &[InteractionRow],
    uids: &[u32],
    event_id: u32,
    ad_id: u32,
    own_event_committed: bool,
) -> (u64, u64, u64, u64) {
    let uid = |e: u32| uids[(e - 1) as usize];
    let mut out = (0, 0, 0, 0);
    for r in scored
        .iter()
        .filter(|r| r.ad_id == ad_id && uid(r.event_id) == uid(event_id))
    {
        let past = r.event_id < event_id || (own_event_committed && r.event_id == event_id);
        let clicked = u64::from(r.clicked == Some(true));
        if past {
            out.0 += 1;
            out.1 += clicked;
        } else if r.event_id != event_id {
            out.2 += 1;
            out.3 += clicked;
        }
    }
    out
}

proptest! {
    #[test]
    fn merge_counts_match_brute_force(
        uids in proptest::collection::vec(0u32..3, EVENTS as usize),
        scored in arb_stream(true),
        unscored in arb_stream(false),
    ) {
        let refs = Arc::new(refs(&uids));
        let mut s = AdStrategy::<u32>::new(refs.clone());
        let mut seed_src = VecRowSource::new(scored.clone());
        seed_future(&mut s, &UidExtractor, &refs, &mut seed_src, 0).unwrap();
        let (mut a, mut b) = (MemorySink::new(), MemorySink::new());
        let stats = merge_join(
            &mut s,
            &UidExtractor,
            &refs,
            &mut VecRowSource::new(scored.clone()),
            &mut VecRowSource::new(unscored.clone()),
            &mut a,
            &mut b,
            0,
        )
        .unwrap();

        prop_assert_eq!(a.rows.len(), scored.len());
        prop_assert_eq!(b.rows.len(), unscored.len());
        prop_assert_eq!(stats.total_rows(), (scored.len() + unscored.len()) as u64);

        for (sink, rows, committed) in [(&a, &scored, false), (&b, &unscored, true)] {
            let got: Vec<_> = column(sink, "ad_past_views")
                .into_iter()
                .zip(column(sink, "ad_past_clicks"))
                .zip(column(sink, "ad_future_views"))
                .zip(column(sink, "ad_future_clicks"))
                .map(|(((pv, pc), fv), fc)| (pv, pc, fv, fc))
                .collect();
            let want: Vec<_> = rows
                .iter()
                .map(|r| expected(&scored, &uids, r.event_id, r.ad_id, committed))
                .collect();
            prop_assert_eq!(got, want);
        }
    }
}
