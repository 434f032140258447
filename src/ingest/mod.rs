/// Ingestion pipeline for raw sensor exports.
///
/// The ASV's sonde writes one CSV export per deployment. Ingestion reads
/// every export in the configured source directory, keeps the numeric cells
/// as raw text, and hands the combined dataset to `analysis::cleaning`
/// before anything touches the store.
///
/// Submodules:
/// - `csv_source` — CSV export parsing into `RawRow`s.

pub mod csv_source;
