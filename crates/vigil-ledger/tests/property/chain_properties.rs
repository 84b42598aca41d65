use proptest::prelude::*;
use vigil_ledger::{verify, EventKind, ProofChain, TamperKind, TriggeringEvent, GENESIS_HASH};
use vigil_types::{Band, CompositeScore};

fn build(values: &[f64]) -> ProofChain {
    let chain = ProofChain::new();
    for (i, v) in values.iter().enumerate() {
        let band = Band::from_index((v * 4.0) as usize).unwrap_or(Band::C0Reactive);
        let composite = CompositeScore {
            tick_index: i as u64,
            timestamp_ms: i as i64 * 100,
            value: *v,
            band,
            stale: false,
            contributions: vec![],
        };
        chain
            .append(
                TriggeringEvent::new(EventKind::Classification { band }, format!("tick {i}")),
                composite,
                i as i64 * 100,
            )
            .unwrap();
    }
    chain
}

proptest! {
    #[test]
    fn untouched_chain_always_verifies(values in prop::collection::vec(0.0f64..=1.0, 0..40)) {
        let chain = build(&values);
        prop_assert!(chain.verify().is_ok());
        prop_assert!(chain.verify().is_ok());
        prop_assert_eq!(chain.len(), values.len());
    }

    #[test]
    fn mutated_value_reported_at_its_index(
        values in prop::collection::vec(0.0f64..=1.0, 1..30),
        pick in any::<prop::sample::Index>(),
        delta in 0.001f64..0.5,
    ) {
        let mut records = build(&values).records();
        let i = pick.index(records.len());
        let v = records[i].composite.value;
        records[i].composite.value = if v + delta <= 1.0 { v + delta } else { v - delta };
        let report = verify(&records).unwrap_err();
        prop_assert_eq!(report.index, i as u64);
        prop_assert_eq!(report.kind, TamperKind::PayloadHashMismatch);
    }

    #[test]
    fn mutated_timestamp_reported_at_its_index(
        values in prop::collection::vec(0.0f64..=1.0, 1..30),
        pick in any::<prop::sample::Index>(),
        shift in 1i64..10_000,
    ) {
        let mut records = build(&values).records();
        let i = pick.index(records.len());
        records[i].timestamp_ms += shift;
        let report = verify(&records).unwrap_err();
        prop_assert_eq!(report.index, i as u64);
        prop_assert_eq!(report.kind, TamperKind::RecordHashMismatch);
    }

    #[test]
    fn first_record_links_to_genesis(values in prop::collection::vec(0.0f64..=1.0, 1..10)) {
        let records = build(&values).records();
        prop_assert_eq!(records[0].prev_hash.as_str(), GENESIS_HASH);
        for pair in records.windows(2) {
            prop_assert_eq!(&pair[1].prev_hash, &pair[0].record_hash);
        }
    }
}
