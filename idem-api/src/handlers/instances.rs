use axum::{extract::State, http::StatusCode, response::IntoResponse, response::Response, Json};
use idem_common::{InstanceRecord, Verb};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::app::state::AppState;
use crate::handlers::error_response;
use crate::jobs::SubmitError;

#[derive(Serialize)]
pub struct InstanceResponse {
    #[serde(flatten)]
    pub instance: InstanceRecord,
    /// Actions the dashboard may offer, derived from the lifecycle state only.
    pub available_actions: Vec<Verb>,
}

#[derive(Deserialize)]
pub struct ActionRequestBody {
    pub instance_id: String,
    pub verb: String,
}

pub async fn list_instances(State(state): State<Arc<AppState>>) -> Response {
    match state.provider.list_instances(&state.scope).await {
        Ok(instances) => {
            let body: Vec<InstanceResponse> = instances
                .into_iter()
                .map(|instance| InstanceResponse {
                    available_actions: instance.available_actions(),
                    instance,
                })
                .collect();
            Json(body).into_response()
        }
        Err(e) => {
            tracing::error!("Error listing instances: {}", e);
            error_response(StatusCode::BAD_GATEWAY, format!("Error listing instances: {}", e))
        }
    }
}

pub async fn execute_action(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ActionRequestBody>,
) -> Response {
    let Some(verb) = Verb::parse(&req.verb) else {
        return error_response(StatusCode::BAD_REQUEST, format!("Unknown action '{}'", req.verb));
    };

    // Fresh listing: the precondition is checked against the provider, not a cached row.
    let instances = match state.provider.list_instances(&state.scope).await {
        Ok(instances) => instances,
        Err(e) => {
            return error_response(StatusCode::BAD_GATEWAY, format!("Error listing instances: {}", e));
        }
    };
    let Some(instance) = instances.into_iter().find(|i| i.id == req.instance_id) else {
        return error_response(StatusCode::NOT_FOUND, "Instance not found");
    };

    match state.runner.submit(instance, verb).await {
        Ok(job_id) => (StatusCode::ACCEPTED, Json(json!({ "job_id": job_id }))).into_response(),
        Err(SubmitError::Busy(active)) => (
            StatusCode::CONFLICT,
            Json(json!({
                "error": format!("Another action is already running (job {})", active),
                "active_job_id": active,
            })),
        )
            .into_response(),
        Err(SubmitError::Rejected(e)) => error_response(StatusCode::CONFLICT, e.to_string()),
    }
}
