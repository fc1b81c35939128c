use anyhow::Context;
use idem_api::app::{build_app, AppState};
use idem_api::config::{provider::build_provider, AppConfig};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env()?;
    if config.poll.is_unbounded() {
        tracing::warn!(
            "IDEM_POLL_MAX_ATTEMPTS is not set: state polling is unbounded and a stuck instance keeps its job running until cancelled"
        );
    }

    let provider = build_provider(&config.provider)?;
    let state = AppState::new(provider, config.scope.clone(), config.poll);
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    tracing::info!(
        "idem-api listening on {} (project {}, zone {})",
        config.bind_addr,
        config.scope.project_id,
        config.scope.zone
    );
    axum::serve(listener, app).await?;
    Ok(())
}
