/// Numeric summary statistics for a single field's sample set.
///
/// A "sample set" is the null-filtered sequence of values for one field
/// (temperature, salinity, or ODO), extracted from a set of observations.
/// Everything here is a pure function of its input — no state carries
/// between calls.
///
/// # Quantile rule
/// Quantiles use linear interpolation between order statistics: for a
/// sorted sample of n values, the q-quantile sits at rank `q * (n - 1)`,
/// interpolating linearly between the two nearest values. Libraries differ
/// on this default, so the rule is fixed here and shared by the IQR outlier
/// detector — Q1/Q3 there must mean the same thing as q25/q75 here.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Summary statistics
// ---------------------------------------------------------------------------

/// Read-only statistical snapshot of one field's sample set.
///
/// For an empty sample set, `count` is 0 and every other field is `None`
/// (serialized as `null`, never zero or NaN) — callers must be able to
/// distinguish "no data" from "value is zero."
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub count: usize,
    pub mean: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub stddev: Option<f64>,
    pub q25: Option<f64>,
    pub q50: Option<f64>,
    pub q75: Option<f64>,
}

impl SummaryStatistics {
    /// The empty-sample-set snapshot: count 0, everything else null.
    pub fn empty() -> Self {
        SummaryStatistics {
            count: 0,
            mean: None,
            min: None,
            max: None,
            stddev: None,
            q25: None,
            q50: None,
            q75: None,
        }
    }
}

/// Computes count, mean, min, max, population standard deviation, and
/// quartiles for a sample set.
///
/// Non-finite values (NaN, ±inf) are excluded before computation; they must
/// never crash the calculation or corrupt the remaining statistics. `count`
/// reports the number of values actually used.
pub fn compute_summary(samples: &[f64]) -> SummaryStatistics {
    let mut sorted = finite_values(samples);
    if sorted.is_empty() {
        return SummaryStatistics::empty();
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let (mean, stddev) = match moments(&sorted) {
        Some(m) => m,
        None => return SummaryStatistics::empty(),
    };

    SummaryStatistics {
        count: sorted.len(),
        mean: Some(mean),
        min: Some(sorted[0]),
        max: Some(sorted[sorted.len() - 1]),
        stddev: Some(stddev),
        q25: quantile_sorted(&sorted, 0.25),
        q50: quantile_sorted(&sorted, 0.50),
        q75: quantile_sorted(&sorted, 0.75),
    }
}

// ---------------------------------------------------------------------------
// Shared primitives
// ---------------------------------------------------------------------------

/// The finite subset of a sample set, in input order.
pub(crate) fn finite_values(samples: &[f64]) -> Vec<f64> {
    samples.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Arithmetic mean and population standard deviation (denominator N, not
/// N−1) of a non-empty slice of finite values. Returns `None` for an empty
/// slice.
pub(crate) fn moments(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Linear-interpolation quantile of an already-sorted slice of finite
/// values, for q in [0, 1]. Returns `None` for an empty slice or a q
/// outside [0, 1].
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    if sorted.len() == 1 {
        return Some(sorted[0]);
    }
    let pos = q * (sorted.len() as f64 - 1.0);
    let idx = pos.floor() as usize;
    let frac = pos - idx as f64;
    let lo = sorted[idx];
    let hi = sorted[(idx + 1).min(sorted.len() - 1)];
    Some(lo + (hi - lo) * frac)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_sample_set_is_all_null() {
        let stats = compute_summary(&[]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None, "empty set must report null mean, not zero");
        assert_eq!(stats.min, None);
        assert_eq!(stats.max, None);
        assert_eq!(stats.stddev, None);
        assert_eq!(stats.q25, None);
        assert_eq!(stats.q50, None);
        assert_eq!(stats.q75, None);
    }

    #[test]
    fn test_single_value() {
        let stats = compute_summary(&[7.5]);
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean, Some(7.5));
        assert_eq!(stats.min, Some(7.5));
        assert_eq!(stats.max, Some(7.5));
        assert_eq!(stats.stddev, Some(0.0));
        assert_eq!(stats.q50, Some(7.5));
    }

    #[test]
    fn test_population_stddev_uses_denominator_n() {
        // Classic textbook sample: population stddev is exactly 2.0;
        // the sample (N-1) estimator would give ~2.138.
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let stats = compute_summary(&samples);
        assert_eq!(stats.mean, Some(5.0));
        assert!((stats.stddev.unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_quantiles_interpolate_linearly() {
        // n = 6: q25 rank is 0.25 * 5 = 1.25 -> 2 + 0.25 * (3 - 2) = 2.25,
        // q75 rank is 3.75 -> 4 + 0.75 * (5 - 4) = 4.75.
        let samples = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let stats = compute_summary(&samples);
        assert!((stats.q25.unwrap() - 2.25).abs() < 1e-12);
        assert!((stats.q50.unwrap() - 3.5).abs() < 1e-12);
        assert!((stats.q75.unwrap() - 4.75).abs() < 1e-12);
    }

    #[test]
    fn test_quantiles_are_ordered_between_min_and_max() {
        let samples = [12.3, 4.4, 19.0, 8.8, 5.1, 16.2, 9.9];
        let stats = compute_summary(&samples);
        let (min, q25, q50, q75, max) = (
            stats.min.unwrap(),
            stats.q25.unwrap(),
            stats.q50.unwrap(),
            stats.q75.unwrap(),
            stats.max.unwrap(),
        );
        assert!(min <= q25 && q25 <= q50 && q50 <= q75 && q75 <= max);
        assert_eq!(stats.count, samples.len());
    }

    #[test]
    fn test_non_finite_values_are_excluded_not_fatal() {
        let samples = [1.0, f64::NAN, 2.0, f64::INFINITY, 3.0, f64::NEG_INFINITY];
        let stats = compute_summary(&samples);
        assert_eq!(stats.count, 3, "only the three finite values count");
        assert_eq!(stats.mean, Some(2.0));
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(3.0));
    }

    #[test]
    fn test_all_non_finite_behaves_like_empty() {
        let stats = compute_summary(&[f64::NAN, f64::INFINITY]);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, None);
    }

    #[test]
    fn test_quantile_sorted_edge_ranks() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&sorted, 1.5), None);
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }
}
