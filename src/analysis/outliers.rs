/// On-demand outlier detection over a single field's sample set.
///
/// Two methods, selected per request by the dashboard:
///
/// - IQR: robust bounds at `[Q1 - k*IQR, Q3 + k*IQR]` using the quantile
///   rule from `analysis::summary`; a sample is an outlier iff strictly
///   outside the bounds. Default k = 1.5.
/// - Z-score: a sample is an outlier iff `|value - mean| / stddev > k`,
///   with population mean and stddev. Default k = 3.0.
///
/// This detector is deliberately separate from the ingestion-time batch
/// cleaner in `analysis::cleaning`: that one is a fixed-method,
/// fixed-threshold, all-fields pass run once per load, while this one is
/// field-selectable and tunable per request. Do not merge the two paths.

use serde::Serialize;

use crate::analysis::summary::{finite_values, moments, quantile_sorted};
use crate::model::ValidationError;

// ---------------------------------------------------------------------------
// Method selection
// ---------------------------------------------------------------------------

/// Outlier classification method, as selected by the `method` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierMethod {
    Iqr,
    Zscore,
}

impl OutlierMethod {
    /// Parses the wire form of the selector. Unknown selectors are a
    /// validation error, never silently defaulted.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iqr" => Ok(OutlierMethod::Iqr),
            "zscore" => Ok(OutlierMethod::Zscore),
            other => Err(ValidationError::UnknownMethod(other.to_string())),
        }
    }

    /// The conventional default sensitivity for this method. The defaults
    /// differ by method and are independently overridable per request.
    pub fn default_k(&self) -> f64 {
        match self {
            OutlierMethod::Iqr => 1.5,
            OutlierMethod::Zscore => 3.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutlierMethod::Iqr => "iqr",
            OutlierMethod::Zscore => "zscore",
        }
    }
}

impl std::fmt::Display for OutlierMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// One sample classified as an outlier.
///
/// `index` is the position in the input sample set, so callers can map the
/// sample back to its source observation. `score` is method-dependent: the
/// absolute z-score under `Zscore`, the violated bound under `Iqr`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutlierPoint {
    pub index: usize,
    pub value: f64,
    pub score: f64,
}

/// Classifies every sample in `samples` under `method` with sensitivity `k`.
///
/// Returns the flagged samples in input order (index-preserving, never
/// sorted by value) — identical inputs always yield the identical result.
/// An empty sample set succeeds with zero outliers. `k` must be finite and
/// strictly positive; anything else is a validation error.
///
/// Non-finite samples are excluded from the distribution estimates and are
/// themselves never flagged.
pub fn detect_outliers(
    samples: &[f64],
    method: OutlierMethod,
    k: f64,
) -> Result<Vec<OutlierPoint>, ValidationError> {
    if !k.is_finite() || k <= 0.0 {
        return Err(ValidationError::NonPositiveK(k));
    }

    let mut finite = finite_values(samples);
    if finite.is_empty() {
        return Ok(Vec::new());
    }

    match method {
        OutlierMethod::Iqr => {
            finite.sort_by(|a, b| a.total_cmp(b));
            // Non-empty input, in-range q: both quantiles exist.
            let (q1, q3) = match (quantile_sorted(&finite, 0.25), quantile_sorted(&finite, 0.75)) {
                (Some(q1), Some(q3)) => (q1, q3),
                _ => return Ok(Vec::new()),
            };
            let iqr = q3 - q1;
            let lower = q1 - k * iqr;
            let upper = q3 + k * iqr;

            Ok(samples
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite() && (**v < lower || **v > upper))
                .map(|(index, &value)| OutlierPoint {
                    index,
                    value,
                    score: if value < lower { lower } else { upper },
                })
                .collect())
        }
        OutlierMethod::Zscore => {
            let (mean, stddev) = match moments(&finite) {
                Some(m) => m,
                None => return Ok(Vec::new()),
            };
            // Zero variance: every value equals the mean; flagging anything
            // would be a false sentinel.
            if stddev == 0.0 {
                return Ok(Vec::new());
            }

            Ok(samples
                .iter()
                .enumerate()
                .filter(|(_, v)| v.is_finite())
                .filter_map(|(index, &value)| {
                    let z = (value - mean).abs() / stddev;
                    (z > k).then_some(OutlierPoint {
                        index,
                        value,
                        score: z,
                    })
                })
                .collect())
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parsing() {
        assert_eq!(OutlierMethod::parse("iqr"), Ok(OutlierMethod::Iqr));
        assert_eq!(OutlierMethod::parse("ZSCORE"), Ok(OutlierMethod::Zscore));
        assert_eq!(
            OutlierMethod::parse("mad"),
            Err(ValidationError::UnknownMethod("mad".to_string())),
            "unknown method selectors must be rejected, not defaulted"
        );
    }

    #[test]
    fn test_default_sensitivity_differs_by_method() {
        assert_eq!(OutlierMethod::Iqr.default_k(), 1.5);
        assert_eq!(OutlierMethod::Zscore.default_k(), 3.0);
    }

    #[test]
    fn test_iqr_flags_the_known_scenario() {
        // Q1 = 2.25, Q3 = 4.75, IQR = 2.5, bounds = [-1.5, 8.5]:
        // only 100 falls outside.
        let samples = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let outliers = detect_outliers(&samples, OutlierMethod::Iqr, 1.5).unwrap();
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].index, 5);
        assert_eq!(outliers[0].value, 100.0);
        assert!((outliers[0].score - 8.5).abs() < 1e-12, "score is the violated upper bound");
    }

    #[test]
    fn test_iqr_bounds_are_strict() {
        // For [1..5], Q1 = 2, Q3 = 4, IQR = 2; with k = 0.5 the bounds are
        // exactly [1.0, 5.0]. Values sitting on a bound are not outliers.
        let samples = [1.0, 2.0, 3.0, 4.0, 5.0];
        let outliers = detect_outliers(&samples, OutlierMethod::Iqr, 0.5).unwrap();
        assert!(
            outliers.is_empty(),
            "samples exactly on the bounds must not be flagged: {:?}",
            outliers
        );
    }

    #[test]
    fn test_zscore_zero_variance_reports_zero_outliers() {
        let samples = [10.0, 10.0, 10.0, 10.0];
        let outliers = detect_outliers(&samples, OutlierMethod::Zscore, 3.0).unwrap();
        assert!(outliers.is_empty(), "stddev 0 must never produce a false sentinel");
    }

    #[test]
    fn test_zscore_flags_extreme_value_with_its_score() {
        let samples = [1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 50.0];
        let outliers = detect_outliers(&samples, OutlierMethod::Zscore, 2.0).unwrap();
        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].index, 9);
        assert!(outliers[0].score > 2.0);
    }

    #[test]
    fn test_empty_sample_set_is_success_not_error() {
        assert_eq!(detect_outliers(&[], OutlierMethod::Iqr, 1.5), Ok(Vec::new()));
        assert_eq!(detect_outliers(&[], OutlierMethod::Zscore, 3.0), Ok(Vec::new()));
    }

    #[test]
    fn test_non_positive_or_non_finite_k_is_rejected() {
        for bad in [0.0, -1.5, f64::NAN, f64::INFINITY] {
            let result = detect_outliers(&[1.0, 2.0], OutlierMethod::Iqr, bad);
            assert!(
                matches!(result, Err(ValidationError::NonPositiveK(_))),
                "k = {} should be rejected, got {:?}",
                bad,
                result
            );
        }
    }

    #[test]
    fn test_indices_track_input_order_not_value_order() {
        let samples = [100.0, 2.0, 3.0, 2.5, 3.5, -90.0];
        let outliers = detect_outliers(&samples, OutlierMethod::Iqr, 1.5).unwrap();
        let indices: Vec<usize> = outliers.iter().map(|o| o.index).collect();
        assert_eq!(indices, vec![0, 5], "flagged indices come back in input order");
    }

    #[test]
    fn test_flagged_value_set_is_order_independent() {
        let a = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        let b = [100.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let mut flagged_a: Vec<f64> = detect_outliers(&a, OutlierMethod::Iqr, 1.5)
            .unwrap()
            .iter()
            .map(|o| o.value)
            .collect();
        let mut flagged_b: Vec<f64> = detect_outliers(&b, OutlierMethod::Iqr, 1.5)
            .unwrap()
            .iter()
            .map(|o| o.value)
            .collect();
        flagged_a.sort_by(|x, y| x.total_cmp(y));
        flagged_b.sort_by(|x, y| x.total_cmp(y));
        assert_eq!(flagged_a, flagged_b);
    }

    #[test]
    fn test_nan_samples_are_never_flagged() {
        let samples = [1.0, f64::NAN, 2.0, 3.0, 100.0];
        let outliers = detect_outliers(&samples, OutlierMethod::Zscore, 1.0).unwrap();
        assert!(outliers.iter().all(|o| o.value.is_finite()));
    }
}
