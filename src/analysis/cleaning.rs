/// Batch cleaning of a raw dataset before it is persisted.
///
/// One fixed pass, run once per ingestion:
///
/// 1. coerce each numeric cell to a number (unparseable text becomes null
///    for that cell only, never failing the row or the dataset),
/// 2. compute dataset-wide population mean and stddev per field,
/// 3. drop every row where any field sits more than 3 standard deviations
///    from its mean,
/// 4. then drop any remaining row still missing a numeric field.
///
/// The moments are computed once on the raw dataset and reused for every
/// row — they are not recomputed on the cleaned subset. The threshold is a
/// fixed policy constant, unlike the per-request sensitivity of
/// `analysis::outliers`; the two passes are intentionally separate code
/// paths with different semantics.

use crate::analysis::summary::moments;
use crate::model::{CleaningReport, FieldName, Observation, RawRow};

/// Multivariate rejection threshold, in standard deviations.
pub const CLEAN_Z_THRESHOLD: f64 = 3.0;

// ---------------------------------------------------------------------------
// Numeric coercion
// ---------------------------------------------------------------------------

/// Parses one raw numeric cell. Missing cells stay missing; present but
/// unparseable (or non-finite) text becomes `None` and is counted as a
/// coercion failure so the caller can report it.
fn coerce_cell(raw: &Option<String>, failures: &mut usize) -> Option<f64> {
    let text = raw.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => {
            *failures += 1;
            None
        }
    }
}

fn coerce_row(row: &RawRow, failures: &mut usize) -> Observation {
    Observation {
        timestamp: row.timestamp.clone(),
        date: row.date.clone(),
        latitude: row.latitude,
        longitude: row.longitude,
        temperature: coerce_cell(&row.temperature, failures),
        salinity: coerce_cell(&row.salinity, failures),
        odo: coerce_cell(&row.odo, failures),
    }
}

// ---------------------------------------------------------------------------
// Cleaning pass
// ---------------------------------------------------------------------------

/// Cleans a raw dataset and reports what was removed.
///
/// `rows_removed` in the report counts multivariate outlier rows; rows
/// dropped afterwards for residual nulls are tallied in
/// `rows_dropped_null`. Row order is preserved.
pub fn clean_dataset(rows: &[RawRow]) -> (Vec<Observation>, CleaningReport) {
    let mut cells_coerced = 0usize;
    let coerced: Vec<Observation> = rows
        .iter()
        .map(|row| coerce_row(row, &mut cells_coerced))
        .collect();

    // Dataset-wide moments per field, over non-null values only. A field
    // with zero variance (or no values at all) never triggers rejection —
    // its z-score contribution is undefined, not infinite.
    let field_moments: Vec<Option<(f64, f64)>> = FieldName::ALL
        .iter()
        .map(|&field| {
            let values: Vec<f64> = coerced.iter().filter_map(|obs| obs.field(field)).collect();
            moments(&values).filter(|&(_, stddev)| stddev > 0.0)
        })
        .collect();

    let is_outlier = |obs: &Observation| -> bool {
        FieldName::ALL.iter().zip(&field_moments).any(|(&field, m)| {
            match (obs.field(field), m) {
                (Some(value), Some((mean, stddev))) => {
                    (value - mean).abs() / stddev > CLEAN_Z_THRESHOLD
                }
                _ => false,
            }
        })
    };

    let rows_total = coerced.len();
    let rows_removed = coerced.iter().filter(|obs| is_outlier(obs)).count();

    let mut rows_dropped_null = 0usize;
    let cleaned: Vec<Observation> = coerced
        .into_iter()
        .filter(|obs| !is_outlier(obs))
        .filter(|obs| {
            let complete = FieldName::ALL.iter().all(|&f| obs.field(f).is_some());
            if !complete {
                rows_dropped_null += 1;
            }
            complete
        })
        .collect();

    let report = CleaningReport {
        rows_total,
        rows_removed,
        rows_remaining: rows_total - rows_removed,
        rows_dropped_null,
        cells_coerced,
    };

    (cleaned, report)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
