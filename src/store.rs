/// Postgres persistence for cleaned observations.
///
/// Every function takes the client as an explicit `&mut postgres::Client`
/// argument — there is no module-level connection, so the statistics engine
/// and the query translator can be tested without a database attached.
///
/// Timestamps are stored as ISO 8601 text rather than TIMESTAMPTZ: the
/// sonde's exports carry no timezone, and lexical comparison of the stored
/// strings matches chronological order, which is all the range filter
/// needs.

use postgres::types::ToSql;
use postgres::Client;

use crate::model::{FieldName, Observation};
use crate::query::ObservationQuery;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Creates the observations table if it does not exist. Column names are
/// the wire field names — the HTTP layer passes them through unchanged.
pub fn init_schema(client: &mut Client) -> Result<(), postgres::Error> {
    client.batch_execute(
        "CREATE TABLE IF NOT EXISTS observations (
            id          BIGSERIAL PRIMARY KEY,
            \"timestamp\" TEXT,
            \"date\"      TEXT,
            latitude    DOUBLE PRECISION,
            longitude   DOUBLE PRECISION,
            temperature DOUBLE PRECISION,
            salinity    DOUBLE PRECISION,
            odo         DOUBLE PRECISION
        )",
    )
}

// ---------------------------------------------------------------------------
// Ingestion writes
// ---------------------------------------------------------------------------

/// Replaces the store's contents with a freshly cleaned dataset: clear,
/// then bulk insert, inside one transaction so a failed run leaves the
/// previous contents in place. Returns the number of rows inserted.
pub fn replace_all(
    client: &mut Client,
    observations: &[Observation],
) -> Result<u64, postgres::Error> {
    let mut tx = client.transaction()?;
    tx.execute("DELETE FROM observations", &[])?;

    let insert = tx.prepare(
        "INSERT INTO observations
            (\"timestamp\", \"date\", latitude, longitude, temperature, salinity, odo)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )?;
    for obs in observations {
        tx.execute(
            &insert,
            &[
                &obs.timestamp,
                &obs.date,
                &obs.latitude,
                &obs.longitude,
                &obs.temperature,
                &obs.salinity,
                &obs.odo,
            ],
        )?;
    }

    tx.commit()?;
    Ok(observations.len() as u64)
}

// ---------------------------------------------------------------------------
// Filtered reads
// ---------------------------------------------------------------------------

/// Builds the WHERE clause and parameter list for an observation query.
/// Clause numbering follows the parameter list, so callers appending
/// LIMIT/OFFSET parameters continue from `params.len() + 1`.
fn filter_sql<'a>(query: &'a ObservationQuery) -> (String, Vec<&'a (dyn ToSql + Sync)>) {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<&'a (dyn ToSql + Sync)> = Vec::new();

    if let Some(ref start) = query.start {
        params.push(start);
        clauses.push(format!("\"timestamp\" >= ${}", params.len()));
    }
    if let Some(ref end) = query.end {
        params.push(end);
        clauses.push(format!("\"timestamp\" <= ${}", params.len()));
    }
    if let Some(ref v) = query.min_temp {
        params.push(v);
        clauses.push(format!("temperature >= ${}", params.len()));
    }
    if let Some(ref v) = query.max_temp {
        params.push(v);
        clauses.push(format!("temperature <= ${}", params.len()));
    }
    if let Some(ref v) = query.min_sal {
        params.push(v);
        clauses.push(format!("salinity >= ${}", params.len()));
    }
    if let Some(ref v) = query.max_sal {
        params.push(v);
        clauses.push(format!("salinity <= ${}", params.len()));
    }
    if let Some(ref v) = query.min_odo {
        params.push(v);
        clauses.push(format!("odo >= ${}", params.len()));
    }
    if let Some(ref v) = query.max_odo {
        params.push(v);
        clauses.push(format!("odo <= ${}", params.len()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", clauses.join(" AND "))
    };
    (where_sql, params)
}

/// Total number of observations matching the filter, before pagination.
pub fn count_observations(
    client: &mut Client,
    query: &ObservationQuery,
) -> Result<i64, postgres::Error> {
    let (where_sql, params) = filter_sql(query);
    let sql = format!("SELECT COUNT(*) FROM observations{}", where_sql);
    let row = client.query_one(sql.as_str(), &params)?;
    Ok(row.get(0))
}

/// One page of observations matching the filter, in insertion order.
pub fn fetch_observations(
    client: &mut Client,
    query: &ObservationQuery,
) -> Result<Vec<Observation>, postgres::Error> {
    let (where_sql, mut params) = filter_sql(query);
    let sql = format!(
        "SELECT \"timestamp\", \"date\", latitude, longitude, temperature, salinity, odo
         FROM observations{} ORDER BY id LIMIT ${} OFFSET ${}",
        where_sql,
        params.len() + 1,
        params.len() + 2,
    );
    params.push(&query.limit);
    params.push(&query.skip);

    let rows = client.query(sql.as_str(), &params)?;
    Ok(rows
        .iter()
        .map(|row| Observation {
            timestamp: row.get(0),
            date: row.get(1),
            latitude: row.get(2),
            longitude: row.get(3),
            temperature: row.get(4),
            salinity: row.get(5),
            odo: row.get(6),
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Field sample extraction
// ---------------------------------------------------------------------------

/// One non-null field value joined with enough source-row context to map
/// an outlier back to the observation it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSample {
    pub value: f64,
    pub timestamp: Option<String>,
    pub date: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// The null-filtered sample set for one field, in insertion order. The
/// order is stable so outlier indices computed from it are reproducible.
pub fn fetch_field_samples(
    client: &mut Client,
    field: FieldName,
) -> Result<Vec<f64>, postgres::Error> {
    let col = field.as_str();
    let sql = format!(
        "SELECT {col} FROM observations WHERE {col} IS NOT NULL ORDER BY id",
        col = col
    );
    let rows = client.query(sql.as_str(), &[])?;
    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Like `fetch_field_samples`, but carrying row context for each value.
pub fn fetch_field_rows(
    client: &mut Client,
    field: FieldName,
) -> Result<Vec<FieldSample>, postgres::Error> {
    let col = field.as_str();
    let sql = format!(
        "SELECT {col}, \"timestamp\", \"date\", latitude, longitude
         FROM observations WHERE {col} IS NOT NULL ORDER BY id",
        col = col
    );
    let rows = client.query(sql.as_str(), &[])?;
    Ok(rows
        .iter()
        .map(|row| FieldSample {
            value: row.get(0),
            timestamp: row.get(1),
            date: row.get(2),
            latitude: row.get(3),
            longitude: row.get(4),
        })
        .collect())
}
