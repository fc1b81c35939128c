// Routes module - Centralizes all route definitions
pub mod dashboard;
pub mod public;

use axum::Router;
use crate::app::AppState;
use std::sync::Arc;

/// Build the main application router
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(public::create_public_routes())
        .merge(dashboard::create_dashboard_routes())
}
