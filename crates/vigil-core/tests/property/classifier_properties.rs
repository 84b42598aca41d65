use std::collections::BTreeMap;

use proptest::prelude::*;
use vigil_core::CompositeClassifier;
use vigil_types::{BandThresholds, TheoryId, TheoryScore};

fn scores(values: &[(f64, f64)]) -> Vec<TheoryScore> {
    values
        .iter()
        .zip(TheoryId::ALL)
        .map(|((v, c), t)| TheoryScore::new(t, *v, *c, vec![]))
        .collect()
}

proptest! {
    #[test]
    fn weighted_mean_lies_within_evidence_range(
        values in prop::collection::vec((0.0f64..=1.0, 0.01f64..=1.0), 1..=5),
    ) {
        let c = CompositeClassifier::new(BandThresholds::default(), BTreeMap::new(), 3);
        let s = scores(&values);
        let mean = c.weighted_mean(&s).unwrap();
        let lo = values.iter().map(|(v, _)| *v).fold(f64::INFINITY, f64::min);
        let hi = values.iter().map(|(v, _)| *v).fold(f64::NEG_INFINITY, f64::max);
        prop_assert!(mean >= lo - 1e-9 && mean <= hi + 1e-9, "{} not in [{}, {}]", mean, lo, hi);
    }

    #[test]
    fn zero_confidence_never_moves_the_mean(
        values in prop::collection::vec((0.0f64..=1.0, 0.01f64..=1.0), 1..=4),
        ignored in 0.0f64..=1.0,
    ) {
        let c = CompositeClassifier::new(BandThresholds::default(), BTreeMap::new(), 3);
        let base = scores(&values);
        let mut with_ignored = values.clone();
        with_ignored.push((ignored, 0.0));
        let extended = scores(&with_ignored);
        let a = c.weighted_mean(&base).unwrap();
        let b = c.weighted_mean(&extended).unwrap();
        prop_assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn no_downgrade_before_h_consecutive_ticks(
        h in 1usize..6,
        high in 0.71f64..=1.0,
        low in 0.0f64..0.69,
    ) {
        let mut c = CompositeClassifier::new(BandThresholds::default(), BTreeMap::new(), h);
        let start = c.classify(0, 0, scores(&[(high, 1.0)])).composite.band;
        for t in 1..h {
            let r = c.classify(t as u64, 0, scores(&[(low, 1.0)]));
            prop_assert_eq!(r.composite.band, start);
            prop_assert!(r.transition.is_none());
        }
        let r = c.classify(h as u64, 0, scores(&[(low, 1.0)]));
        prop_assert!(r.composite.band < start);
        prop_assert!(r.transition.is_some());
    }

    #[test]
    fn upward_moves_are_immediate(low in 0.0f64..0.19, high in 0.86f64..=1.0, h in 1usize..6) {
        let mut c = CompositeClassifier::new(BandThresholds::default(), BTreeMap::new(), h);
        c.classify(0, 0, scores(&[(low, 1.0)]));
        let r = c.classify(1, 0, scores(&[(high, 1.0)]));
        prop_assert_eq!(r.composite.band, BandThresholds::default().classify(high));
    }
}
