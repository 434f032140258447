/// Core data types for the water-quality observation service.
///
/// This module defines the shared domain model imported by all other modules.
/// It contains no I/O and no external dependencies — only types.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Persisted field names
// ---------------------------------------------------------------------------

/// Column name for water temperature, in degrees Celsius.
pub const FIELD_TEMPERATURE: &str = "temperature";

/// Column name for salinity, in parts per thousand.
pub const FIELD_SALINITY: &str = "salinity";

/// Column name for dissolved oxygen (ODO), in mg/L.
pub const FIELD_ODO: &str = "odo";

/// The three measured quantities every observation may carry.
///
/// These are the only fields the statistics and outlier endpoints accept;
/// the string forms above are the persisted column names and are passed
/// through the HTTP layer unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldName {
    Temperature,
    Salinity,
    Odo,
}

impl FieldName {
    /// The persisted column name for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldName::Temperature => FIELD_TEMPERATURE,
            FieldName::Salinity => FIELD_SALINITY,
            FieldName::Odo => FIELD_ODO,
        }
    }

    /// All fields, in canonical order.
    pub const ALL: [FieldName; 3] = [
        FieldName::Temperature,
        FieldName::Salinity,
        FieldName::Odo,
    ];
}

impl std::fmt::Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// One row of a sensor CSV export, before any numeric coercion.
///
/// Numeric cells are kept as raw text here: the export occasionally contains
/// non-numeric garbage in numeric columns, and what to do with it is the
/// cleaning pass's decision, not the parser's.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawRow {
    pub timestamp: Option<String>, // ISO 8601, composed from date + time columns
    pub date: Option<String>,      // original "m/d/y" date string
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature: Option<String>,
    pub salinity: Option<String>,
    pub odo: Option<String>,
}

/// A cleaned observation, as persisted to and served from the store.
///
/// Any numeric field may be absent for a given observation; missing values
/// never participate in statistics. Rows that survive the cleaning pass
/// have all three numeric fields present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: Option<String>, // ISO 8601, lexical order == chronological order
    pub date: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature: Option<f64>,
    pub salinity: Option<f64>,
    pub odo: Option<f64>,
}

impl Observation {
    /// The value of one numeric field, if present.
    pub fn field(&self, field: FieldName) -> Option<f64> {
        match field {
            FieldName::Temperature => self.temperature,
            FieldName::Salinity => self.salinity,
            FieldName::Odo => self.odo,
        }
    }
}

// ---------------------------------------------------------------------------
// Cleaning report
// ---------------------------------------------------------------------------

/// Summary of one batch-cleaning run.
///
/// `rows_removed` counts multivariate outlier rows only; it is taken before
/// the final null-drop step, so `rows_total - rows_removed == rows_remaining`
/// always holds. Rows dropped for residual nulls and cells that failed
/// numeric coercion are reported separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub rows_total: usize,
    pub rows_removed: usize,
    pub rows_remaining: usize,
    pub rows_dropped_null: usize,
    pub cells_coerced: usize,
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A request parameter that failed validation.
///
/// Every variant names the parameter it refers to, so the API layer can
/// report which parameter failed and why instead of a bare parse error.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// `field` was not one of temperature/salinity/odo.
    UnknownField(String),
    /// `method` was not one of iqr/zscore.
    UnknownMethod(String),
    /// A numeric parameter could not be parsed as a number.
    InvalidNumber { parameter: &'static str, value: String },
    /// A timestamp parameter was not valid ISO 8601.
    InvalidTimestamp { parameter: &'static str, value: String },
    /// `limit` must be strictly positive.
    NonPositiveLimit(i64),
    /// `skip` must be zero or positive.
    NegativeSkip(i64),
    /// The sensitivity `k` must be a finite number greater than zero.
    NonPositiveK(f64),
}

impl ValidationError {
    /// The name of the request parameter this error refers to.
    pub fn parameter(&self) -> &'static str {
        match self {
            ValidationError::UnknownField(_) => "field",
            ValidationError::UnknownMethod(_) => "method",
            ValidationError::InvalidNumber { parameter, .. } => parameter,
            ValidationError::InvalidTimestamp { parameter, .. } => parameter,
            ValidationError::NonPositiveLimit(_) => "limit",
            ValidationError::NegativeSkip(_) => "skip",
            ValidationError::NonPositiveK(_) => "k",
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::UnknownField(name) => {
                write!(f, "field must be one of temperature/salinity/odo, got '{}'", name)
            }
            ValidationError::UnknownMethod(name) => {
                write!(f, "method must be one of iqr/zscore, got '{}'", name)
            }
            ValidationError::InvalidNumber { parameter, value } => {
                write!(f, "{} must be a valid number, got '{}'", parameter, value)
            }
            ValidationError::InvalidTimestamp { parameter, value } => {
                write!(f, "{} must be a valid ISO timestamp, got '{}'", parameter, value)
            }
            ValidationError::NonPositiveLimit(v) => write!(f, "limit must be > 0, got {}", v),
            ValidationError::NegativeSkip(v) => write!(f, "skip must be >= 0, got {}", v),
            ValidationError::NonPositiveK(v) => write!(f, "k must be > 0, got {}", v),
        }
    }
}

impl std::error::Error for ValidationError {}
