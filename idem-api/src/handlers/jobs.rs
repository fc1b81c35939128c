use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::app::state::AppState;
use crate::handlers::error_response;
use crate::jobs::CancelError;

pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Response {
    Json(state.runner.list().await).into_response()
}

pub async fn get_job(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.runner.get(id).await {
        Some(job) => Json(job).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Job not found"),
    }
}

pub async fn cancel_job(State(state): State<Arc<AppState>>, Path(id): Path<Uuid>) -> Response {
    match state.runner.cancel(id).await {
        Ok(()) => (StatusCode::ACCEPTED, "Cancellation requested").into_response(),
        Err(e @ CancelError::NotFound(_)) => error_response(StatusCode::NOT_FOUND, e.to_string()),
        Err(e @ CancelError::AlreadyFinished(_)) => error_response(StatusCode::CONFLICT, e.to_string()),
    }
}
