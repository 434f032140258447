/// HTTP front for the API operations.
///
/// This layer only parses requests and formats responses — every decision
/// lives in `api`. The store client is synchronous and shared behind a
/// mutex, so requests serialize on it; at dashboard query rates that is
/// not a bottleneck.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use postgres::Client;
use serde_json::Value;

use crate::api::{self, ApiError};
use crate::logging::{self, DataSource};

type SharedClient = Arc<Mutex<Client>>;

// ---------------------------------------------------------------------------
// Response mapping
// ---------------------------------------------------------------------------

fn status_for(err: &ApiError) -> StatusCode {
    match err {
        ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        ApiError::Store(_) | ApiError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond(result: Result<Value, ApiError>) -> Response {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            match &err {
                ApiError::Validation(e) => {
                    logging::warn(DataSource::Api, Some(e.parameter()), &err.to_string())
                }
                _ => logging::error(DataSource::Api, None, &err.to_string()),
            }
            (status_for(&err), Json(err.payload())).into_response()
        }
    }
}

fn lock_client(client: &SharedClient) -> MutexGuard<'_, Client> {
    // A panic while holding the lock poisons it; the connection itself is
    // still usable, so recover the guard rather than failing every
    // request from then on.
    match client.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

async fn health_route() -> Response {
    (StatusCode::OK, Json(api::health())).into_response()
}

async fn observations_route(
    State(client): State<SharedClient>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    respond(api::observations(&params, &mut lock_client(&client)))
}

async fn stats_route(State(client): State<SharedClient>) -> Response {
    respond(api::stats(&mut lock_client(&client)))
}

async fn outliers_route(
    State(client): State<SharedClient>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    respond(api::outliers(&params, &mut lock_client(&client)))
}

/// Builds the API router over a shared store client.
pub fn router(client: SharedClient) -> Router {
    Router::new()
        .route("/api/health", get(health_route))
        .route("/api/observations", get(observations_route))
        .route("/api/stats", get(stats_route))
        .route("/api/outliers", get(outliers_route))
        .with_state(client)
}

/// Binds and serves the API until the process is stopped.
pub fn serve(bind: &str, client: Client) -> std::io::Result<()> {
    let app = router(Arc::new(Mutex::new(client)));
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(bind).await?;
        logging::info(
            DataSource::System,
            None,
            &format!("API listening on http://{}", bind),
        );
        axum::serve(listener, app).await
    })
}
