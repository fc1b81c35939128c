// Instance listing and power actions used by the dashboard page
use crate::app::AppState;
use crate::handlers::{instances, jobs};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn create_dashboard_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/instances", get(instances::list_instances))
        .route("/actions", post(instances::execute_action))
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs/{id}/cancel", post(jobs::cancel_job))
}
