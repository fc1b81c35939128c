use async_trait::async_trait;
use idem_common::{InstanceRecord, LifecycleState, Verb};

/// Provider-side grouping the dashboard lists instances from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub project_id: String,
    pub zone: String,
}

impl Scope {
    pub fn new(project_id: impl Into<String>, zone: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into().trim().to_string(),
            zone: zone.into().trim().to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider API error: status={status} message={message}")]
    Api { status: u16, message: String },
    #[error("instance {0} not found")]
    NotFound(String),
    #[error("provider transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected provider response: {0}")]
    Malformed(String),
}

/// Boundary to a compute API. One instance is built at startup and shared by
/// the poller, the workflow and the HTTP layer.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Provider code used in logs (`scaleway`, `mock`).
    fn name(&self) -> &'static str;

    /// All instances visible in `scope`, as returned by a single provider call.
    /// An empty list means "no instances", never an error.
    async fn list_instances(&self, scope: &Scope) -> Result<Vec<InstanceRecord>, ProviderError>;

    // Point-in-time read, used by the poller.
    async fn get_state(&self, instance_id: &str) -> Result<LifecycleState, ProviderError>;

    /// Ask the provider to begin a transition. Returns as soon as the request is
    /// accepted; completion is observed through `get_state`.
    async fn perform_action(&self, instance_id: &str, verb: Verb) -> Result<(), ProviderError>;
}

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "scaleway")]
pub mod scaleway;
