//! Property-based tests for abcd-plot
//!
//! - Generation ordering depends only on the embedded number
//! - The tolerance clamp is monotone and bounded
//! - Kernel densities are non-negative and integrate to one
//! - Run with ProptestConfig::with_cases(100)

use std::collections::HashSet;
use std::fs;

use abcd_plot::kde::{Kde1d, Kde2d};
use abcd_plot::locator::{locate_generations, parse_generation_number, DEFAULT_PATTERN};
use abcd_plot::table::log_tolerance;
use proptest::prelude::*;

// ============================================================================
// Property Test Generators (Strategies)
// ============================================================================

/// Distinct generation numbers with a zero padding width per file
fn arb_generations() -> impl Strategy<Value = Vec<(u32, usize)>> {
    proptest::collection::hash_set(0u32..100_000, 1..12).prop_flat_map(|numbers| {
        let numbers: Vec<u32> = numbers.into_iter().collect();
        let len = numbers.len();
        (Just(numbers), proptest::collection::vec(0usize..8, len))
            .prop_map(|(numbers, widths)| numbers.into_iter().zip(widths).collect())
            .prop_shuffle()
    })
}

/// Samples with non-trivial spread
fn arb_samples() -> impl Strategy<Value = Vec<f64>> {
    proptest::collection::vec(-50.0f64..50.0, 5..60)
        .prop_filter("needs spread", |v| {
            let first = v[0];
            v.iter().any(|x| (x - first).abs() > 1e-3)
        })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: padding never changes the parsed number
    #[test]
    fn prop_padding_is_ignored(number in 0u32..u32::MAX, width in 0usize..12) {
        let name = format!("gen_{number:0width$}.json");
        prop_assert_eq!(parse_generation_number(&name).unwrap(), number);
    }

    /// Property: clamp output stays within [0, ln 1.5] and never decreases
    #[test]
    fn prop_log_tolerance_bounded_and_monotone(a in 0.0f64..1e6, b in 0.0f64..1e6) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(log_tolerance(lo) >= 0.0);
        prop_assert!(log_tolerance(hi) <= 1.5f64.ln() + 1e-15);
        prop_assert!(log_tolerance(lo) <= log_tolerance(hi));
    }

    /// Property: values above the clamp all map to ln 1.5
    #[test]
    fn prop_log_tolerance_saturates(t in 0.5f64..1e9) {
        prop_assert!((log_tolerance(t) - 1.5f64.ln()).abs() < 1e-12);
    }

    /// Property: 1-D density is non-negative and integrates to about one
    #[test]
    fn prop_kde1d_integrates_to_one(values in arb_samples()) {
        let kde = Kde1d::fit(&values, 1.0).unwrap();
        let (lo, hi) = kde.data_range();
        prop_assert!(kde.bandwidth() > 0.0);
        prop_assert!(lo < hi);
        let curve = kde.curve(8.0, 4000);
        let area: f64 = curve
            .windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum();
        prop_assert!(curve.iter().all(|p| p.1 >= 0.0));
        prop_assert!((area - 1.0).abs() < 1e-2, "area = {}", area);
    }

    /// Property: 2-D density is symmetric under swapping both the data and the query
    #[test]
    fn prop_kde2d_swap_symmetry(xs in arb_samples(), ys in arb_samples(), qx in -50.0f64..50.0, qy in -50.0f64..50.0) {
        let n = xs.len().min(ys.len());
        let points: Vec<(f64, f64)> = xs[..n].iter().copied().zip(ys[..n].iter().copied()).collect();
        let swapped: Vec<(f64, f64)> = points.iter().map(|&(x, y)| (y, x)).collect();
        if let (Some(a), Some(b)) = (Kde2d::fit(&points, 1.0), Kde2d::fit(&swapped, 1.0)) {
            let (da, db) = (a.density(qx, qy), b.density(qy, qx));
            if da.max(db) > 1e-200 {
                prop_assert!((da - db).abs() <= 1e-9 * da.max(db));
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    /// Property: located files are strictly increasing whatever the creation order
    #[test]
    fn prop_locator_output_strictly_increasing(generations in arb_generations()) {
        let dir = tempfile::tempdir().unwrap();
        for &(number, width) in &generations {
            fs::write(dir.path().join(format!("gen_{number:0width$}.json")), "{}").unwrap();
        }

        let files = locate_generations(dir.path(), DEFAULT_PATTERN).unwrap();
        let numbers: Vec<u32> = files.iter().map(|f| f.number()).collect();

        prop_assert_eq!(numbers.len(), generations.len());
        prop_assert!(numbers.windows(2).all(|w| w[0] < w[1]));
        let expected: HashSet<u32> = generations.iter().map(|(n, _)| *n).collect();
        prop_assert_eq!(numbers.into_iter().collect::<HashSet<_>>(), expected);
    }
}
