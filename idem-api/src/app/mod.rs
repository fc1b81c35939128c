// Application state and configuration
pub mod state;

pub use state::AppState;

use axum::Router;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::routes::create_router;

/// Create CORS layer with permissive settings
pub fn create_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Full application: routes, CORS and shared state.
pub fn build_app(state: Arc<AppState>) -> Router {
    create_router()
        .layer(create_cors())
        .with_state(state)
}
