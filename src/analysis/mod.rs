/// Statistics engine for the water-quality observation service.
///
/// Everything in here is a pure, synchronous function over an in-memory
/// sample set or dataset — no store access, no hidden state between calls.
/// The serving API and the ingestion pipeline both sit on top of these.
///
/// Submodules:
/// - `summary` — count/mean/min/max/stddev/quartiles for one field.
/// - `outliers` — per-request IQR and z-score outlier detection.
/// - `cleaning` — the one-shot multivariate rejection pass run at ingestion.

pub mod cleaning;
pub mod outliers;
pub mod summary;
