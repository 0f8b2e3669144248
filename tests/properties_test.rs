//! Property tests for the statistics and calibration core

use deltacal::calibrate::{
    analyze_one_sided, Calibrator, Distribution, FallbackRanges, ThresholdSeparation,
};
use deltacal::corpus::SampleCorpus;
use deltacal::models::CellType;
use proptest::prelude::*;

fn deltas(range: std::ops::RangeInclusive<i64>, max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(range, 1..max_len)
}

fn fallback() -> FallbackRanges {
    FallbackRanges {
        aa: None,
        aaa: Some((250, 380)),
    }
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]

    #[test]
    fn percentile_is_bounded_and_monotone(samples in deltas(-500..=500, 200)) {
        let d = Distribution::from_samples("p", &samples).unwrap();
        prop_assert_eq!(d.percentile(0.0), d.min);
        prop_assert_eq!(d.percentile(100.0), d.max);
        let mut last = d.min;
        for p in [0.5, 2.5, 5.0, 25.0, 50.0, 90.0, 95.0, 97.5, 99.0, 99.5, 99.9] {
            let v = d.percentile(p);
            prop_assert!(v >= last, "p{} = {} < {}", p, v, last);
            last = v;
        }
    }

    #[test]
    fn mode_is_most_frequent_and_first_seen(samples in deltas(-5..=5, 60)) {
        let d = Distribution::from_samples("m", &samples).unwrap();
        let count = |v: i64| samples.iter().filter(|&&s| s == v).count();
        let best = count(d.mode);
        prop_assert!(samples.iter().all(|&v| count(v) <= best));
        let first_max = samples.iter().copied().find(|&v| count(v) == best).unwrap();
        prop_assert_eq!(d.mode, first_max);
    }

    #[test]
    fn clean_threshold_sits_between_correct_and_misdetected(
        correct in deltas(-60..=60, 150),
        misdetected in deltas(-400..=400, 20),
    ) {
        let a = analyze_one_sided(CellType::Aa, &correct, &misdetected).unwrap();
        prop_assert_eq!(a.candidates.len(), 4);
        prop_assert!(a.candidate(99.9).is_some());
        let min_mis = a.min_misdetection().unwrap();
        for c in &a.candidates {
            match c.separation {
                ThresholdSeparation::Clean { optimal } => {
                    prop_assert!(c.threshold <= optimal && optimal < min_mis);
                }
                ThresholdSeparation::Overlap { low, high } => prop_assert!(low <= high),
                ThresholdSeparation::NoEvidence => prop_assert!(false, "misdetections were supplied"),
            }
        }
    }

    #[test]
    fn calibration_is_deterministic_and_consistent(
        aa in deltas(-80..=80, 120),
        aa_as_aaa in prop::collection::vec(150i64..=400, 0..10),
        aaa in deltas(200..=400, 120),
        aaa_as_aa in prop::collection::vec(-50i64..=150, 0..10),
    ) {
        let corpus = SampleCorpus::from_deltas(aa, aa_as_aaa, aaa, aaa_as_aa);
        let calibrator = Calibrator::new(fallback());
        let first = calibrator.calibrate(&corpus).unwrap();
        let second = calibrator.calibrate(&corpus).unwrap();
        prop_assert_eq!(&first.result, &second.result);

        let result = first.result;
        prop_assert!(result.aa.range.min <= result.aa.range.max);
        prop_assert!(result.aaa.range.min <= result.aaa.range.max);
        prop_assert_eq!(result.separated, result.gap_mv >= 0);
        prop_assert!(result.aa.covered <= result.aa.total);
        prop_assert_eq!(first.levels.len(), 3);
    }
}
