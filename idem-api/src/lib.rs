// Library entry point for tests and external usage

pub mod app;
pub mod config;
pub mod handlers;
pub mod jobs;
pub mod routes;

// Re-export commonly used types
pub use app::AppState;
