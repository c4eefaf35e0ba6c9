use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::fmt::Write;
use vitals_common::metric::{Metric, MetricKind, Snapshot};
use vitals_storage::StorageError;

use crate::state::AppState;

/// Maps handler failures onto the HTTP surface: unknown metrics are 404,
/// malformed payloads and values 400, everything else 500 with the detail
/// logged.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("'{raw}' is not a valid {kind} value")]
    InvalidValue { kind: MetricKind, raw: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Storage(StorageError::NotFound { kind, name }) => {
                tracing::debug!(kind = %kind, name = %name, "metric not found");
                StatusCode::NOT_FOUND
            }
            ApiError::Storage(StorageError::MissingPayload { kind, name }) => {
                tracing::warn!(kind = %kind, name = %name, "metric payload missing");
                StatusCode::BAD_REQUEST
            }
            ApiError::InvalidValue { kind, raw } => {
                tracing::warn!(kind = %kind, raw = %raw, "metric value does not parse");
                StatusCode::BAD_REQUEST
            }
            ApiError::Storage(e) => {
                tracing::error!(error = %e, "storage operation failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        status.into_response()
    }
}

/// `GET /` — every stored metric, one `name: value` line per entry, sorted
/// by name, gauges rendered with one decimal.
pub async fn index(State(state): State<AppState>) -> Result<Response, ApiError> {
    let entries = state.storage.get_all()?;
    let mut body = String::new();
    for entry in entries {
        let _ = writeln!(body, "{}: {}", entry.name, entry.value);
    }
    Ok((
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        body,
    )
        .into_response())
}

/// `GET /value/gauge/{name}`
pub async fn value_gauge(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<String, ApiError> {
    Ok(state.storage.get_gauge(&name)?.to_string())
}

/// `GET /value/counter/{name}`
pub async fn value_counter(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<String, ApiError> {
    Ok(state.storage.get_counter(&name)?.to_string())
}

/// `POST /update/gauge/{name}/{value}`
pub async fn update_gauge_path(
    State(state): State<AppState>,
    Path((name, raw)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let value: f64 = raw.parse().map_err(|_| ApiError::InvalidValue {
        kind: MetricKind::Gauge,
        raw,
    })?;
    state.storage.set_gauge(&name, value)?;
    Ok(StatusCode::OK)
}

/// `POST /update/counter/{name}/{value}`
pub async fn update_counter_path(
    State(state): State<AppState>,
    Path((name, raw)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let delta: i64 = raw.parse().map_err(|_| ApiError::InvalidValue {
        kind: MetricKind::Counter,
        raw,
    })?;
    state.storage.set_counter(&name, delta)?;
    Ok(StatusCode::OK)
}

/// `POST /value/` — JSON query by id and kind; responds with the full
/// metric carrying the current stored value.
pub async fn value_json(
    State(state): State<AppState>,
    Json(query): Json<Metric>,
) -> Result<Json<Metric>, ApiError> {
    let metric = match query.kind {
        MetricKind::Gauge => {
            let value = state.storage.get_gauge(&query.id)?;
            Metric::gauge(query.id, value)
        }
        MetricKind::Counter => {
            let delta = state.storage.get_counter(&query.id)?;
            Metric::counter(query.id, delta)
        }
    };
    Ok(Json(metric))
}

/// `POST /update/` — applies one JSON metric and echoes the stored state,
/// so a counter update answers with the accumulated total.
pub async fn update_json(
    State(state): State<AppState>,
    Json(metric): Json<Metric>,
) -> Result<Json<Metric>, ApiError> {
    match metric.kind {
        MetricKind::Gauge => {
            let value = metric.value.ok_or(StorageError::MissingPayload {
                kind: metric.kind,
                name: metric.id.clone(),
            })?;
            state.storage.set_gauge(&metric.id, value)?;
            Ok(Json(Metric::gauge(metric.id, value)))
        }
        MetricKind::Counter => {
            let delta = metric.delta.ok_or(StorageError::MissingPayload {
                kind: metric.kind,
                name: metric.id.clone(),
            })?;
            state.storage.set_counter(&metric.id, delta)?;
            let total = state.storage.get_counter(&metric.id)?;
            Ok(Json(Metric::counter(metric.id, total)))
        }
    }
}

/// `POST /updates/` — applies a snapshot as one batch, in list order.
pub async fn update_batch(
    State(state): State<AppState>,
    Json(snapshot): Json<Snapshot>,
) -> Result<StatusCode, ApiError> {
    state.storage.set_batch(snapshot.metrics())?;
    tracing::debug!(count = snapshot.len(), "batch ingested");
    Ok(StatusCode::OK)
}

/// `GET /ping` — storage liveness.
pub async fn ping(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    state.storage.ping()?;
    Ok(StatusCode::OK)
}
