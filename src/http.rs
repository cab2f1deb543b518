//! HTTP API for the poll server
//!
//! | Method | Path                      | Body           | Success                  |
//! |--------|---------------------------|----------------|--------------------------|
//! | GET    | `/health`                 |                | `{status, version}`      |
//! | GET    | `/params`                 |                | [`PollParams`]           |
//! | POST   | `/polls`                  | `{pk, rlk}`    | `{id}`                   |
//! | GET    | `/polls/:id`              |                | [`PollSnapshot`]         |
//! | POST   | `/polls/:id/responses`    | `{name, ct}`   | 204                      |
//! | POST   | `/polls/:id/close`        |                | [`PollSnapshot`]         |
//!
//! Failures are `{error}` with 404 (unknown poll), 409 (closed), 400 (bad
//! payload) or 500 (aggregation failure; the poll stays open).

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::params::PollParams;
use crate::poll::PollSnapshot;
use crate::protocol::{PollService, ProtocolError};

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize, Deserialize)]
pub struct CreatePollRequest {
    pub pk: String,
    pub rlk: String,
}

#[derive(Serialize, Deserialize)]
pub struct CreatePollResponse {
    pub id: String,
}

#[derive(Serialize, Deserialize)]
pub struct SubmitResponseRequest {
    pub name: String,
    pub ct: String,
}

#[derive(Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(err: ProtocolError) -> ApiError {
    let status = match &err {
        ProtocolError::NotFound => StatusCode::NOT_FOUND,
        ProtocolError::Closed | ProtocolError::AlreadyClosed => StatusCode::CONFLICT,
        ProtocolError::BadPayload(_) => StatusCode::BAD_REQUEST,
        ProtocolError::Aggregation(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn get_params(State(svc): State<Arc<PollService>>) -> Json<PollParams> {
    Json(svc.params().clone())
}

/// Run a CPU-bound service call (payload decoding, aggregation) off the async workers
async fn run_blocking<T, F>(task: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProtocolError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| {
            error!("blocking task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "blocking task failed".to_string(),
                }),
            )
        })?
        .map_err(api_error)
}

async fn create_poll(
    State(svc): State<Arc<PollService>>,
    Json(req): Json<CreatePollRequest>,
) -> Result<Json<CreatePollResponse>, ApiError> {
    let id = run_blocking(move || svc.create_poll(&req.pk, &req.rlk)).await?;
    Ok(Json(CreatePollResponse { id }))
}

async fn get_poll(
    State(svc): State<Arc<PollService>>,
    Path(id): Path<String>,
) -> Result<Json<PollSnapshot>, ApiError> {
    svc.get_poll_public_state(&id).map(Json).map_err(api_error)
}

async fn submit_response(
    State(svc): State<Arc<PollService>>,
    Path(id): Path<String>,
    Json(req): Json<SubmitResponseRequest>,
) -> Result<StatusCode, ApiError> {
    run_blocking(move || svc.submit_response(&id, &req.name, &req.ct)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn close_poll(
    State(svc): State<Arc<PollService>>,
    Path(id): Path<String>,
) -> Result<Json<PollSnapshot>, ApiError> {
    let snapshot = run_blocking(move || {
        svc.close_poll(&id)?;
        svc.get_poll_public_state(&id)
    })
    .await?;

    Ok(Json(snapshot))
}

/// Build the router over a shared service
pub fn router(service: Arc<PollService>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/params", get(get_params))
        .route("/polls", post(create_poll))
        .route("/polls/:id", get(get_poll))
        .route("/polls/:id/responses", post(submit_response))
        .route("/polls/:id/close", post(close_poll))
        .with_state(service)
}
