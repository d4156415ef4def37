//! Property-based tests for invariants that must hold for every input
//! in their domain, not just the handful of examples exercised by the
//! unit tests alongside each module.

use filament_sliding::math::{clamp_strictly_inside, modulo, next_after};
use filament_sliding::statistics::{Histogram, Statistics};
use proptest::prelude::*;

proptest! {
    // Euclidean modulo always lands in [0, |y|), regardless of sign.
    #[test]
    fn modulo_always_in_range(x in -1.0e6f64..1.0e6, y in (1.0e-3f64..1.0e6)) {
        let m = modulo(x, y);
        prop_assert!(m >= 0.0 && m < y);
    }

    #[test]
    fn modulo_with_negative_divisor_matches_positive(x in -1.0e6f64..1.0e6, y in 1.0e-3f64..1.0e6) {
        prop_assert_eq!(modulo(x, y), modulo(x, -y));
    }

    // Stepping toward a target never overshoots it and always moves.
    #[test]
    fn next_after_moves_strictly_toward_target(x in -1.0e3f64..1.0e3, to in -1.0e3f64..1.0e3) {
        prop_assume!(x != to);
        let stepped = next_after(x, to);
        prop_assert_ne!(stepped, x);
        if to > x {
            prop_assert!(stepped > x && stepped <= to);
        } else {
            prop_assert!(stepped < x && stepped >= to);
        }
    }

    // Clamping strictly inside an interval always produces a value in
    // the open interval, no matter where the input sample falls.
    #[test]
    fn clamp_strictly_inside_is_idempotent(x in -1.0e3f64..1.0e3, lo in -1.0e3f64..0.0, hi in 0.0f64..1.0e3) {
        let (clamped, _) = clamp_strictly_inside(x, lo, hi);
        prop_assert!(clamped > lo && clamped < hi);
        let (reclamped, was_clamped_again) = clamp_strictly_inside(clamped, lo, hi);
        prop_assert!(!was_clamped_again);
        prop_assert_eq!(reclamped, clamped);
    }

    // Every sample fed to a Histogram lands in exactly one bucket:
    // total count across bins and outer buckets equals samples fed.
    #[test]
    fn histogram_total_equals_samples_fed(samples in prop::collection::vec(-100.0f64..100.0, 0..200)) {
        let mut h = Histogram::new(vec![-10.0, -5.0, 0.0, 5.0, 10.0]).unwrap();
        for &s in &samples {
            h.add_sample(s);
        }
        prop_assert_eq!(h.total() as usize, samples.len());
    }

    // Welford's accumulator's mean matches the naive arithmetic mean
    // for any finite, non-empty sample set.
    #[test]
    fn statistics_mean_matches_naive_average(samples in prop::collection::vec(-1.0e4f64..1.0e4, 1..200)) {
        let mut s = Statistics::new();
        for &x in &samples {
            s.add_sample(x);
        }
        let naive_mean = samples.iter().sum::<f64>() / samples.len() as f64;
        prop_assert!((s.mean() - naive_mean).abs() < 1e-6 * naive_mean.abs().max(1.0));
    }
}
