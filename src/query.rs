/// Translation of raw request parameters into validated query structs.
///
/// The HTTP layer hands over an untyped string-to-string parameter map;
/// everything recognized is re-expressed here as a strongly typed struct,
/// and every malformed value is a `ValidationError` naming the parameter —
/// a native parse error never crosses this boundary. Unrecognized keys are
/// ignored, matching how the dashboard has always called the API.

use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::analysis::outliers::OutlierMethod;
use crate::model::{FieldName, ValidationError, FIELD_ODO, FIELD_SALINITY, FIELD_TEMPERATURE};

/// Page size when the request does not specify one.
pub const DEFAULT_LIMIT: i64 = 100;

/// Hard cap on page size; larger requests are clamped, not rejected.
pub const MAX_LIMIT: i64 = 1000;

// ---------------------------------------------------------------------------
// Observation queries
// ---------------------------------------------------------------------------

/// A validated observation filter: timestamp range, per-field numeric
/// ranges, and pagination.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    pub min_temp: Option<f64>,
    pub max_temp: Option<f64>,
    pub min_sal: Option<f64>,
    pub max_sal: Option<f64>,
    pub min_odo: Option<f64>,
    pub max_odo: Option<f64>,
    pub limit: i64,
    pub skip: i64,
}

impl Default for ObservationQuery {
    fn default() -> Self {
        ObservationQuery {
            start: None,
            end: None,
            min_temp: None,
            max_temp: None,
            min_sal: None,
            max_sal: None,
            min_odo: None,
            max_odo: None,
            limit: DEFAULT_LIMIT,
            skip: 0,
        }
    }
}

/// Validates the observation-listing parameters:
/// `{start, end, min_temp, max_temp, min_sal, max_sal, min_odo, max_odo,
/// limit, skip}`.
pub fn parse_observation_query(
    params: &HashMap<String, String>,
) -> Result<ObservationQuery, ValidationError> {
    let limit = match int_param(params, "limit")? {
        Some(v) if v <= 0 => return Err(ValidationError::NonPositiveLimit(v)),
        Some(v) => v.min(MAX_LIMIT),
        None => DEFAULT_LIMIT,
    };
    let skip = match int_param(params, "skip")? {
        Some(v) if v < 0 => return Err(ValidationError::NegativeSkip(v)),
        Some(v) => v,
        None => 0,
    };

    Ok(ObservationQuery {
        start: timestamp_param(params, "start")?,
        end: timestamp_param(params, "end")?,
        min_temp: float_param(params, "min_temp")?,
        max_temp: float_param(params, "max_temp")?,
        min_sal: float_param(params, "min_sal")?,
        max_sal: float_param(params, "max_sal")?,
        min_odo: float_param(params, "min_odo")?,
        max_odo: float_param(params, "max_odo")?,
        limit,
        skip,
    })
}

// ---------------------------------------------------------------------------
// Outlier queries
// ---------------------------------------------------------------------------

/// A validated outlier-detection request: which field, which method, and
/// how sensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierQuery {
    pub field: FieldName,
    pub method: OutlierMethod,
    pub k: f64,
}

/// Validates the outlier-detection parameters `{field, method, k}`.
///
/// `field` is required. `method` defaults to z-score when absent; `k`
/// defaults per method (1.5 for IQR, 3.0 for z-score) and may be
/// overridden independently.
pub fn parse_outlier_query(
    params: &HashMap<String, String>,
) -> Result<OutlierQuery, ValidationError> {
    let field = parse_field(params.get("field").map(String::as_str).unwrap_or(""))?;

    let method = match params.get("method") {
        Some(raw) => OutlierMethod::parse(raw)?,
        None => OutlierMethod::Zscore,
    };

    let k = match float_param(params, "k")? {
        Some(v) if !v.is_finite() || v <= 0.0 => return Err(ValidationError::NonPositiveK(v)),
        Some(v) => v,
        None => method.default_k(),
    };

    Ok(OutlierQuery { field, method, k })
}

/// Parses a field selector. Anything but the three known field names is a
/// validation error.
pub fn parse_field(s: &str) -> Result<FieldName, ValidationError> {
    match s.trim().to_ascii_lowercase().as_str() {
        FIELD_TEMPERATURE => Ok(FieldName::Temperature),
        FIELD_SALINITY => Ok(FieldName::Salinity),
        FIELD_ODO => Ok(FieldName::Odo),
        other => Err(ValidationError::UnknownField(other.to_string())),
    }
}

// ---------------------------------------------------------------------------
// Parameter helpers
// ---------------------------------------------------------------------------

fn float_param(
    params: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<f64>, ValidationError> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(ValidationError::InvalidNumber {
                parameter: name,
                value: raw.clone(),
            }),
        },
    }
}

fn int_param(
    params: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<i64>, ValidationError> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| ValidationError::InvalidNumber {
                parameter: name,
                value: raw.clone(),
            }),
    }
}

/// Validates a timestamp parameter and keeps its original string form:
/// timestamps are persisted as ISO 8601 text, so range filtering compares
/// strings lexically and the exact input spelling matters.
///
/// Accepts an explicit offset (including a trailing `Z`) or a naive
/// `YYYY-MM-DDTHH:MM:SS` form.
fn timestamp_param(
    params: &HashMap<String, String>,
    name: &'static str,
) -> Result<Option<String>, ValidationError> {
    match params.get(name) {
        None => Ok(None),
        Some(raw) => {
            let s = raw.trim();
            let valid = chrono::DateTime::parse_from_rfc3339(s).is_ok()
                || NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f").is_ok();
            if valid {
                Ok(Some(s.to_string()))
            } else {
                Err(ValidationError::InvalidTimestamp {
                    parameter: name,
                    value: raw.clone(),
                })
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_params_yield_defaults() {
        let q = parse_observation_query(&params(&[])).unwrap();
        assert_eq!(q, ObservationQuery::default());
        assert_eq!(q.limit, 100);
        assert_eq!(q.skip, 0);
    }

    #[test]
    fn test_limit_is_capped_not_rejected() {
        let q = parse_observation_query(&params(&[("limit", "5000")])).unwrap();
        assert_eq!(q.limit, 1000);
    }

    #[test]
    fn test_non_positive_limit_is_rejected() {
        let err = parse_observation_query(&params(&[("limit", "0")])).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveLimit(0));
        assert_eq!(err.parameter(), "limit");
    }

    #[test]
    fn test_negative_skip_is_rejected() {
        let err = parse_observation_query(&params(&[("skip", "-3")])).unwrap_err();
        assert_eq!(err, ValidationError::NegativeSkip(-3));
    }

    #[test]
    fn test_bad_numeric_range_names_the_parameter() {
        let err = parse_observation_query(&params(&[("min_temp", "warm")])).unwrap_err();
        assert_eq!(err.parameter(), "min_temp");
        assert!(err.to_string().contains("warm"));
    }

    #[test]
    fn test_non_finite_range_value_is_rejected() {
        let err = parse_observation_query(&params(&[("max_odo", "inf")])).unwrap_err();
        assert_eq!(err.parameter(), "max_odo");
    }

    #[test]
    fn test_timestamps_accept_offset_z_and_naive_forms() {
        for ok in [
            "2021-12-16T10:00:00Z",
            "2021-12-16T10:00:00+00:00",
            "2021-12-16T10:00:00.250-05:00",
            "2021-12-16T10:00:00",
        ] {
            let q = parse_observation_query(&params(&[("start", ok)])).unwrap();
            assert_eq!(q.start.as_deref(), Some(ok));
        }
    }

    #[test]
    fn test_bad_timestamp_is_rejected() {
        let err = parse_observation_query(&params(&[("end", "12/16/21")])).unwrap_err();
        assert_eq!(err.parameter(), "end");
    }

    #[test]
    fn test_numeric_ranges_parse() {
        let q = parse_observation_query(&params(&[
            ("min_temp", "20.5"),
            ("max_temp", "30"),
            ("min_sal", "34.1"),
            ("max_odo", "8.25"),
            ("limit", "250"),
            ("skip", "500"),
        ]))
        .unwrap();
        assert_eq!(q.min_temp, Some(20.5));
        assert_eq!(q.max_temp, Some(30.0));
        assert_eq!(q.min_sal, Some(34.1));
        assert_eq!(q.max_sal, None);
        assert_eq!(q.max_odo, Some(8.25));
        assert_eq!(q.limit, 250);
        assert_eq!(q.skip, 500);
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let q = parse_observation_query(&params(&[("favorite_color", "teal")])).unwrap();
        assert_eq!(q, ObservationQuery::default());
    }

    #[test]
    fn test_outlier_query_defaults_k_per_method() {
        let q = parse_outlier_query(&params(&[("field", "temperature"), ("method", "iqr")]))
            .unwrap();
        assert_eq!(q.k, 1.5);
        let q = parse_outlier_query(&params(&[("field", "odo"), ("method", "zscore")])).unwrap();
        assert_eq!(q.k, 3.0);
    }

    #[test]
    fn test_outlier_query_k_override() {
        let q = parse_outlier_query(&params(&[
            ("field", "salinity"),
            ("method", "iqr"),
            ("k", "2.5"),
        ]))
        .unwrap();
        assert_eq!(q.field, FieldName::Salinity);
        assert_eq!(q.k, 2.5);
    }

    #[test]
    fn test_outlier_query_rejects_unknown_field_and_method() {
        let err = parse_outlier_query(&params(&[("field", "ph")])).unwrap_err();
        assert_eq!(err, ValidationError::UnknownField("ph".to_string()));

        let err =
            parse_outlier_query(&params(&[("field", "odo"), ("method", "magic")])).unwrap_err();
        assert_eq!(err, ValidationError::UnknownMethod("magic".to_string()));
    }

    #[test]
    fn test_outlier_query_rejects_bad_k() {
        let err = parse_outlier_query(&params(&[("field", "odo"), ("k", "-1")])).unwrap_err();
        assert_eq!(err, ValidationError::NonPositiveK(-1.0));

        let err = parse_outlier_query(&params(&[("field", "odo"), ("k", "lots")])).unwrap_err();
        assert_eq!(err.parameter(), "k");
    }

    #[test]
    fn test_outlier_query_requires_field() {
        let err = parse_outlier_query(&params(&[("method", "iqr")])).unwrap_err();
        assert_eq!(err, ValidationError::UnknownField("".to_string()));
    }
}
