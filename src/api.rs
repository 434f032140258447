/// The service's API operations, independent of any HTTP framework.
///
/// Each operation takes the raw request parameters and a store client and
/// returns a JSON value or a typed `ApiError` — nothing in here panics or
/// lets a native parse error escape to the transport. The HTTP front in
/// `server` maps errors to status codes and this module's payloads to
/// response bodies.

use std::collections::HashMap;

use postgres::Client;
use serde_json::{json, Value};

use crate::analysis::outliers::{detect_outliers, OutlierMethod};
use crate::analysis::summary::compute_summary;
use crate::model::{FieldName, ValidationError};
use crate::query::{parse_observation_query, parse_outlier_query};
use crate::store;

// ---------------------------------------------------------------------------
// Error type at the API boundary
// ---------------------------------------------------------------------------

/// Everything that can go wrong serving a request. Validation failures are
/// the caller's fault; the other variants are ours.
#[derive(Debug)]
pub enum ApiError {
    Validation(ValidationError),
    Store(postgres::Error),
    Serialization(serde_json::Error),
}

impl ApiError {
    /// The structured error body served to the client. Validation errors
    /// name the offending parameter; internal failures deliberately do not
    /// leak their details.
    pub fn payload(&self) -> Value {
        match self {
            ApiError::Validation(e) => json!({
                "error": e.to_string(),
                "parameter": e.parameter(),
            }),
            ApiError::Store(_) => json!({ "error": "database error" }),
            ApiError::Serialization(_) => json!({ "error": "internal error" }),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Validation(e) => write!(f, "validation error: {}", e),
            ApiError::Store(e) => write!(f, "database error: {}", e),
            ApiError::Serialization(e) => write!(f, "serialization error: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Validation(e)
    }
}

impl From<postgres::Error> for ApiError {
    fn from(e: postgres::Error) -> Self {
        ApiError::Store(e)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Serialization(e)
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Liveness check.
pub fn health() -> Value {
    json!({ "status": "ok" })
}

/// Filtered, paginated observation listing:
/// `{"count": <total matching>, "items": [...]}`.
pub fn observations(
    params: &HashMap<String, String>,
    client: &mut Client,
) -> Result<Value, ApiError> {
    let query = parse_observation_query(params)?;
    let total = store::count_observations(client, &query)?;
    let items = store::fetch_observations(client, &query)?;
    Ok(json!({ "count": total, "items": items }))
}

/// Summary statistics for every numeric field, keyed by field name.
/// Fields with no data report count 0 and null statistics.
pub fn stats(client: &mut Client) -> Result<Value, ApiError> {
    let mut body = serde_json::Map::new();
    for field in FieldName::ALL {
        let samples = store::fetch_field_samples(client, field)?;
        let summary = compute_summary(&samples);
        body.insert(field.as_str().to_string(), serde_json::to_value(summary)?);
    }
    Ok(Value::Object(body))
}

/// On-demand outlier detection over one field's current sample set:
/// `{"count", "field", "method", "k", "outliers": [...]}`.
///
/// Each outlier carries the flagged value under the field's own name, its
/// index in the sample set, the method-specific score (`z_score` or the
/// violated `bound`), and the source row's timestamp/date/position so the
/// dashboard can show where the reading came from.
pub fn outliers(
    params: &HashMap<String, String>,
    client: &mut Client,
) -> Result<Value, ApiError> {
    let query = parse_outlier_query(params)?;
    let rows = store::fetch_field_rows(client, query.field)?;
    let values: Vec<f64> = rows.iter().map(|r| r.value).collect();

    let detected = detect_outliers(&values, query.method, query.k)?;

    let items: Vec<Value> = detected
        .iter()
        .map(|point| {
            let source = &rows[point.index];
            let mut item = serde_json::Map::new();
            item.insert(query.field.as_str().to_string(), json!(point.value));
            item.insert("index".to_string(), json!(point.index));
            match query.method {
                OutlierMethod::Zscore => item.insert("z_score".to_string(), json!(point.score)),
                OutlierMethod::Iqr => item.insert("bound".to_string(), json!(point.score)),
            };
            item.insert("timestamp".to_string(), json!(source.timestamp));
            item.insert("date".to_string(), json!(source.date));
            item.insert("latitude".to_string(), json!(source.latitude));
            item.insert("longitude".to_string(), json!(source.longitude));
            Value::Object(item)
        })
        .collect();

    Ok(json!({
        "count": items.len(),
        "field": query.field.as_str(),
        "method": query.method.as_str(),
        "k": query.k,
        "outliers": items,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_payload() {
        assert_eq!(health(), json!({ "status": "ok" }));
    }

    #[test]
    fn test_validation_error_payload_names_the_parameter() {
        let err = ApiError::Validation(ValidationError::NonPositiveLimit(-5));
        let payload = err.payload();
        assert_eq!(payload["parameter"], "limit");
        assert!(payload["error"].as_str().unwrap().contains("limit"));
    }

    #[test]
    fn test_store_error_payload_does_not_leak_details() {
        // A validation payload has a parameter; internal ones just say
        // what layer failed.
        let err = ApiError::Validation(ValidationError::UnknownField("ph".into()));
        assert_eq!(err.payload()["parameter"], "field");
    }
}
