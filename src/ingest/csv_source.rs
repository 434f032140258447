/// Sensor CSV export parsing.
///
/// Reads the sonde's CSV exports into `RawRow`s. Numeric cells are kept as
/// raw text — coercion (and the decision about what to do with garbage
/// cells) belongs to the cleaning pass. A row timestamp is composed from
/// the date and time columns when both parse; rows where they don't simply
/// carry no timestamp.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveTime};

use crate::logging::{self, DataSource};
use crate::model::RawRow;

// ---------------------------------------------------------------------------
// Export column headers
// ---------------------------------------------------------------------------

// Header names as the sonde writes them. Matching is trimmed and
// case-insensitive since firmware revisions have disagreed on casing.
pub const COL_TEMPERATURE: &str = "Temperature (c)";
pub const COL_SALINITY: &str = "Salinity (ppt)";
pub const COL_ODO: &str = "ODO mg/L";
pub const COL_DATE: &str = "Date m/d/y";
pub const COL_TIME: &str = "Time hh:mm:ss";
pub const COL_LATITUDE: &str = "Latitude";
pub const COL_LONGITUDE: &str = "Longitude";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum IngestError {
    Io(std::io::Error),
    Csv(csv::Error),
}

impl std::fmt::Display for IngestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IngestError::Io(e) => write!(f, "I/O error: {}", e),
            IngestError::Csv(e) => write!(f, "CSV error: {}", e),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<std::io::Error> for IngestError {
    fn from(e: std::io::Error) -> Self {
        IngestError::Io(e)
    }
}

impl From<csv::Error> for IngestError {
    fn from(e: csv::Error) -> Self {
        IngestError::Csv(e)
    }
}

// ---------------------------------------------------------------------------
// Column resolution
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ColumnIndexes {
    temperature: Option<usize>,
    salinity: Option<usize>,
    odo: Option<usize>,
    date: Option<usize>,
    time: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
}

impl ColumnIndexes {
    fn resolve(headers: &csv::StringRecord) -> Self {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        ColumnIndexes {
            temperature: find(COL_TEMPERATURE),
            salinity: find(COL_SALINITY),
            odo: find(COL_ODO),
            date: find(COL_DATE),
            time: find(COL_TIME),
            latitude: find(COL_LATITUDE),
            longitude: find(COL_LONGITUDE),
        }
    }

    /// Expected columns that were not found in the header row.
    fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.temperature.is_none() {
            missing.push(COL_TEMPERATURE);
        }
        if self.salinity.is_none() {
            missing.push(COL_SALINITY);
        }
        if self.odo.is_none() {
            missing.push(COL_ODO);
        }
        missing
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parses one CSV export. `context` labels log output (usually the file
/// name). A missing numeric column is tolerated — every cell of that
/// column is simply absent — but it is worth a warning, since a whole-file
/// miss usually means a firmware header change.
pub fn parse_reader<R: Read>(reader: R, context: &str) -> Result<Vec<RawRow>, IngestError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let columns = ColumnIndexes::resolve(csv_reader.headers()?);
    let missing = columns.missing();
    if !missing.is_empty() {
        logging::warn(
            DataSource::Csv,
            Some(context),
            &format!("missing expected column(s): {}", missing.join(", ")),
        );
    }

    let mut rows = Vec::new();
    for record in csv_reader.records() {
        let record = record?;

        let date = text_cell(&record, columns.date);
        let time = text_cell(&record, columns.time);
        let timestamp = match (date.as_deref(), time.as_deref()) {
            (Some(d), Some(t)) => compose_timestamp(d, t),
            _ => None,
        };

        rows.push(RawRow {
            timestamp,
            date,
            latitude: float_cell(&record, columns.latitude),
            longitude: float_cell(&record, columns.longitude),
            temperature: text_cell(&record, columns.temperature),
            salinity: text_cell(&record, columns.salinity),
            odo: text_cell(&record, columns.odo),
        });
    }

    Ok(rows)
}

/// Reads one export file.
pub fn read_csv_file(path: &Path) -> Result<Vec<RawRow>, IngestError> {
    let file = std::fs::File::open(path)?;
    let context = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_reader(file, &context)
}

/// Reads every `*.csv` export in `dir`, in sorted filename order so repeat
/// runs over the same directory always produce the same row order.
///
/// Returns the combined rows and the number of files read.
pub fn load_source_dir(dir: &Path) -> Result<(Vec<RawRow>, usize), IngestError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();

    if paths.is_empty() {
        logging::warn(
            DataSource::Csv,
            None,
            &format!("no CSV exports found in {}", dir.display()),
        );
    }

    let mut rows = Vec::new();
    for path in &paths {
        let file_rows = read_csv_file(path)?;
        logging::info(
            DataSource::Csv,
            path.file_name().and_then(|n| n.to_str()),
            &format!("loaded {} rows", file_rows.len()),
        );
        rows.extend(file_rows);
    }

    Ok((rows, paths.len()))
}

// ---------------------------------------------------------------------------
// Cell helpers
// ---------------------------------------------------------------------------

/// A trimmed text cell; empty cells become `None`.
fn text_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<String> {
    let value = record.get(idx?)?.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// A numeric cell parsed leniently: anything unparseable is simply absent.
/// Used for latitude/longitude, which do not flow into statistics.
fn float_cell(record: &csv::StringRecord, idx: Option<usize>) -> Option<f64> {
    text_cell(record, idx)?
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Composes an ISO 8601 timestamp from the export's `m/d/y` date and
/// `H:M:S` time columns. Two-digit and four-digit years both occur in the
/// wild. Returns `None` when either part does not parse.
fn compose_timestamp(date: &str, time: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(date, "%m/%d/%y")
        .or_else(|_| NaiveDate::parse_from_str(date, "%m/%d/%Y"))
        .ok()?;
    let time = NaiveTime::parse_from_str(time, "%H:%M:%S").ok()?;
    Some(date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const EXPORT: &str = "\
Date m/d/y,Time hh:mm:ss,Latitude,Longitude,Temperature (c),Salinity (ppt),ODO mg/L
12/16/21,10:05:30,25.7617,-80.1918,22.4,35.1,6.5
12/16/21,10:06:00,25.7618,-80.1919,22.5,abc,6.6
12/16/21,10:06:30,,,22.6,35.3,
";

    #[test]
    fn test_parses_rows_with_raw_numeric_text() {
        let rows = parse_reader(EXPORT.as_bytes(), "test").unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].temperature.as_deref(), Some("22.4"));
        assert_eq!(rows[0].salinity.as_deref(), Some("35.1"));
        assert_eq!(rows[0].odo.as_deref(), Some("6.5"));
        assert_eq!(rows[0].latitude, Some(25.7617));
        assert_eq!(rows[0].longitude, Some(-80.1918));
        assert_eq!(rows[0].date.as_deref(), Some("12/16/21"));

        // Garbage stays as raw text for the cleaner to judge.
        assert_eq!(rows[1].salinity.as_deref(), Some("abc"));

        // Empty cells are absent.
        assert_eq!(rows[2].latitude, None);
        assert_eq!(rows[2].odo, None);
    }

    #[test]
    fn test_timestamp_is_composed_from_date_and_time() {
        let rows = parse_reader(EXPORT.as_bytes(), "test").unwrap();
        assert_eq!(rows[0].timestamp.as_deref(), Some("2021-12-16T10:05:30"));
    }

    #[test]
    fn test_four_digit_year_also_parses() {
        let export = "\
Date m/d/y,Time hh:mm:ss,Temperature (c),Salinity (ppt),ODO mg/L
12/16/2021,10:05:30,22.4,35.1,6.5
";
        let rows = parse_reader(export.as_bytes(), "test").unwrap();
        assert_eq!(rows[0].timestamp.as_deref(), Some("2021-12-16T10:05:30"));
    }

    #[test]
    fn test_unparseable_date_or_time_yields_no_timestamp() {
        let export = "\
Date m/d/y,Time hh:mm:ss,Temperature (c),Salinity (ppt),ODO mg/L
yesterday,10:05:30,22.4,35.1,6.5
12/16/21,morning,22.4,35.1,6.5
";
        let rows = parse_reader(export.as_bytes(), "test").unwrap();
        assert_eq!(rows[0].timestamp, None);
        assert_eq!(rows[1].timestamp, None);
        // The original date text is still preserved.
        assert_eq!(rows[0].date.as_deref(), Some("yesterday"));
    }

    #[test]
    fn test_header_matching_is_case_insensitive() {
        let export = "\
date m/d/y,TIME HH:MM:SS,temperature (C),salinity (PPT),odo MG/L
12/16/21,10:05:30,22.4,35.1,6.5
";
        let rows = parse_reader(export.as_bytes(), "test").unwrap();
        assert_eq!(rows[0].temperature.as_deref(), Some("22.4"));
        assert_eq!(rows[0].odo.as_deref(), Some("6.5"));
    }

    #[test]
    fn test_missing_column_is_tolerated() {
        let export = "\
Date m/d/y,Time hh:mm:ss,Temperature (c),Salinity (ppt)
12/16/21,10:05:30,22.4,35.1
";
        let rows = parse_reader(export.as_bytes(), "test").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].odo, None);
        assert_eq!(rows[0].temperature.as_deref(), Some("22.4"));
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let export = "\
Site,Date m/d/y,Time hh:mm:ss,Temperature (c),Salinity (ppt),ODO mg/L,Battery V
asv_1,12/16/21,10:05:30,22.4,35.1,6.5,12.1
";
        let rows = parse_reader(export.as_bytes(), "test").unwrap();
        assert_eq!(rows[0].temperature.as_deref(), Some("22.4"));
        assert_eq!(rows[0].odo.as_deref(), Some("6.5"));
    }
}
