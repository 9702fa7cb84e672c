//! # API Handlers
//!
//! The backend side of the query gateway contract, plus status and module
//! listing.

use crate::datasets::route_key;
use crate::AppState;
use axum::{
    extract::{FromRequest, Request, State},
    http::{Method, StatusCode},
    Json,
};
use dq_core::{evaluator, DataQueryConfig, QueryRequest, Row};
use rand::Rng;
use serde::Serialize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[derive(Serialize)]
pub struct StatusResponse {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
    uptime_secs: u64,
    modules: usize,
    queries_served: u64,
    fail_rate: f64,
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        timestamp: chrono::Utc::now(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        modules: state.modules.len(),
        queries_served: state.queries_served.load(Ordering::Relaxed),
        fail_rate: state.fail_rate,
    })
}

pub async fn modules(State(state): State<Arc<AppState>>) -> Json<Vec<DataQueryConfig>> {
    Json(state.modules.clone())
}

fn dataset(state: &AppState, path: &str) -> Result<Arc<Vec<Row>>, (StatusCode, String)> {
    state
        .datasets
        .get(path)
        .cloned()
        .ok_or((StatusCode::NOT_FOUND, format!("No dataset at {}", path)))
}

/// Serves every configured endpoint: `GET <endpoint>` loads the dataset and
/// `POST <endpoint>/query` filters it.
pub async fn dataset_route(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Row>>, (StatusCode, String)> {
    let path = route_key(request.uri().path());

    if request.method() == Method::GET {
        return load_dataset(&state, &path);
    }
    if request.method() == Method::POST {
        if let Some(endpoint) = path.strip_suffix("/query") {
            let endpoint = endpoint.to_string();
            let Json(req) = Json::<QueryRequest>::from_request(request, &state)
                .await
                .map_err(|e| (e.status(), e.body_text()))?;
            return query_dataset(&state, &endpoint, req);
        }
    }
    Err((StatusCode::NOT_FOUND, format!("No route for {}", path)))
}

fn load_dataset(
    state: &AppState,
    path: &str,
) -> Result<Json<Vec<Row>>, (StatusCode, String)> {
    let rows = dataset(state, path)?;
    Ok(Json(rows.as_ref().clone()))
}

fn query_dataset(
    state: &AppState,
    endpoint: &str,
    req: QueryRequest,
) -> Result<Json<Vec<Row>>, (StatusCode, String)> {
    let rows = dataset(state, endpoint)?;

    let inject = state.fail_rate > 0.0
        && state
            .rng
            .lock()
            .map(|mut rng| rng.gen_bool(state.fail_rate))
            .unwrap_or(false);
    if inject {
        tracing::warn!("Injected failure for query on {}", endpoint);
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Injected failure".to_string(),
        ));
    }

    let matched = evaluator::filter_rows(&rows, &req.conditions);
    state.queries_served.fetch_add(1, Ordering::Relaxed);
    tracing::info!(
        "Query on {} with {} conditions matched {} of {} rows",
        endpoint,
        req.conditions.len(),
        matched.len(),
        rows.len()
    );
    Ok(Json(matched))
}
