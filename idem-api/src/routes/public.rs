// Public routes: the dashboard page and liveness
use crate::app::AppState;
use axum::response::Html;
use axum::routing::get;
use axum::Router;
use std::sync::Arc;

const DASHBOARD_HTML: &str = include_str!("../../assets/dashboard.html");

/// Create public routes router
pub fn create_public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

async fn root() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

async fn health() -> &'static str {
    "ok"
}
