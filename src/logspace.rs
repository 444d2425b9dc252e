//! # Logspace — Base-10 Log-Magnitude Arithmetic
//!
//! Every magnitude in the engine is stored as `log10` of itself, so values
//! spanning hundreds of orders of magnitude never leave `f64` range. Zero is
//! represented by `f64::NEG_INFINITY`. This module provides the only two
//! arithmetic operations the representation cannot express as plain `+`/`-`
//! (sum and difference of the underlying magnitudes), plus the threshold
//! search used for milestone counts and pub-table lookups.
//!
//! `subtract` assumes the first magnitude is at least the second; calling it
//! the other way round yields `NaN` by construction. That contract is upheld
//! at every call site rather than checked here.

/// `log10(A + B)` for `a = log10(A)`, `b = log10(B)`.
///
/// Computed as `max + log10(1 + 10^(min - max))` so neither magnitude is
/// ever materialized. If both inputs are `-inf` (both zero) the result is
/// `-inf`.
#[inline]
pub fn add2(a: f64, b: f64) -> f64 {
    let (max, min) = if a > b { (a, b) } else { (b, a) };
    if max == f64::NEG_INFINITY {
        max
    } else {
        max + (1.0 + 10f64.powf(min - max)).log10()
    }
}

/// Left-fold of [`add2`] over a slice. An empty slice sums to zero, i.e.
/// `-inf`.
pub fn add(values: &[f64]) -> f64 {
    match values {
        [] => f64::NEG_INFINITY,
        [single] => *single,
        [first, rest @ ..] => rest.iter().fold(*first, |acc, &v| add2(acc, v)),
    }
}

/// `log10(A - B)` for `a = log10(A)`, `b = log10(B)`, requiring `A >= B`.
///
/// `subtract(x, x)` is exactly `-inf` (the magnitudes cancel), and
/// subtracting zero (`-inf`) is the identity.
#[inline]
pub fn subtract(a: f64, b: f64) -> f64 {
    let (max, min) = if a > b { (a, b) } else { (b, a) };
    if max == f64::NEG_INFINITY {
        max
    } else {
        max + (1.0 - 10f64.powf(min - max)).log10()
    }
}

/// Insertion index of `target` in a sorted ascending slice: the number of
/// elements `<= target`. Used for milestone-count lookup (how many unlock
/// thresholds has progress passed) and pub-table lookups.
pub fn binary_insertion_search(arr: &[f64], target: f64) -> usize {
    arr.partition_point(|&x| x <= target)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    // ── add ────────────────────────────────────────────────────────

    /// Doubling a magnitude adds log10(2) to its log.
    #[test]
    fn add_equal_values_is_log2_step() {
        for x in [-300.0, -1.0, 0.0, 2.5, 500.0] {
            assert!((add2(x, x) - (x + 2f64.log10())).abs() < EPS);
        }
    }

    /// Adding zero (-inf) is the identity.
    #[test]
    fn add_zero_identity() {
        assert_eq!(add2(123.0, f64::NEG_INFINITY), 123.0);
        assert_eq!(add2(f64::NEG_INFINITY, 123.0), 123.0);
        assert_eq!(add2(f64::NEG_INFINITY, f64::NEG_INFINITY), f64::NEG_INFINITY);
    }

    /// Fold edge cases: empty sums to zero, singleton is itself.
    #[test]
    fn add_fold() {
        assert_eq!(add(&[]), f64::NEG_INFINITY);
        assert_eq!(add(&[7.0]), 7.0);
        // 10 + 100 + 1000 = 1110
        assert!((add(&[1.0, 2.0, 3.0]) - 1110f64.log10()).abs() < EPS);
    }

    /// Values far enough apart that the small term vanishes in f64.
    #[test]
    fn add_extreme_spread() {
        assert_eq!(add2(500.0, -500.0), 500.0);
    }

    // ── subtract ───────────────────────────────────────────────────

    #[test]
    fn subtract_identities() {
        assert_eq!(subtract(42.0, f64::NEG_INFINITY), 42.0);
        assert_eq!(subtract(5.0, 5.0), f64::NEG_INFINITY);
        // 100 - 10 = 90
        assert!((subtract(2.0, 1.0) - 90f64.log10()).abs() < EPS);
    }

    // ── binary_insertion_search ────────────────────────────────────

    #[test]
    fn search_anchors() {
        let arr = [10.0, 20.0, 30.0];
        assert_eq!(binary_insertion_search(&arr, 15.0), 1);
        assert_eq!(binary_insertion_search(&arr, 5.0), 0);
        assert_eq!(binary_insertion_search(&arr, 30.0), 3);
        assert_eq!(binary_insertion_search(&arr, 10.0), 1);
        assert_eq!(binary_insertion_search(&arr, 1e9), 3);
        assert_eq!(binary_insertion_search(&[], 10.0), 0);
    }
}
