// Process configuration, read once at startup from the environment (and `.env`).
pub mod provider;

use anyhow::{bail, Context, Result};
use idem_orchestrator::PollPolicy;
use idem_providers::scaleway::ScalewaySettings;
use idem_providers::Scope;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8003";
pub const DEFAULT_SCALEWAY_ZONE: &str = "fr-par-2";
pub const DEFAULT_SECRET_KEY_FILE: &str = "/run/secrets/scaleway_secret_key";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MOCK_TRANSITION_POLLS: u32 = 2;

#[derive(Debug, Clone)]
pub enum ProviderSettings {
    Scaleway(ScalewaySettings),
    Mock { transition_polls: u32 },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub provider: ProviderSettings,
    pub scope: Scope,
    pub poll: PollPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; `from_env` passes the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind_raw = get("IDEM_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_raw
            .parse()
            .with_context(|| format!("IDEM_BIND_ADDR is not a socket address: {}", bind_raw))?;

        let interval_secs = match get("IDEM_POLL_INTERVAL_SECS") {
            Some(raw) => {
                let secs = raw
                    .parse::<u64>()
                    .with_context(|| format!("IDEM_POLL_INTERVAL_SECS is not a number: {}", raw))?;
                if secs == 0 {
                    bail!("IDEM_POLL_INTERVAL_SECS must be at least 1");
                }
                secs
            }
            None => DEFAULT_POLL_INTERVAL_SECS,
        };
        let max_attempts = match get("IDEM_POLL_MAX_ATTEMPTS") {
            Some(raw) => {
                let n = raw
                    .parse::<u32>()
                    .with_context(|| format!("IDEM_POLL_MAX_ATTEMPTS is not a number: {}", raw))?;
                if n == 0 {
                    bail!("IDEM_POLL_MAX_ATTEMPTS must be at least 1");
                }
                Some(n)
            }
            None => None,
        };
        let poll = PollPolicy {
            interval: Duration::from_secs(interval_secs),
            max_attempts,
        };

        let provider_name = get("PROVIDER").unwrap_or_else(|| "scaleway".to_string());
        let (provider, scope) = match provider_name.to_ascii_lowercase().as_str() {
            "scaleway" => {
                let project_id = get("SCALEWAY_PROJECT_ID").context("SCALEWAY_PROJECT_ID must be set")?;
                let zone = get("SCALEWAY_ZONE").unwrap_or_else(|| DEFAULT_SCALEWAY_ZONE.to_string());
                // Prefer *_FILE for secrets (Docker/K8s friendly), fallback to env var.
                let secret_key_file =
                    get("SCALEWAY_SECRET_KEY_FILE").unwrap_or_else(|| DEFAULT_SECRET_KEY_FILE.to_string());
                let secret_key = std::fs::read_to_string(&secret_key_file)
                    .ok()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .or_else(|| get("SCALEWAY_SECRET_KEY"))
                    .context("SCALEWAY_SECRET_KEY (or SCALEWAY_SECRET_KEY_FILE) must be set")?;
                (
                    ProviderSettings::Scaleway(ScalewaySettings {
                        secret_key,
                        zone: zone.clone(),
                    }),
                    Scope::new(project_id, zone),
                )
            }
            "mock" => {
                let transition_polls = match get("MOCK_TRANSITION_POLLS") {
                    Some(raw) => raw
                        .parse::<u32>()
                        .with_context(|| format!("MOCK_TRANSITION_POLLS is not a number: {}", raw))?,
                    None => DEFAULT_MOCK_TRANSITION_POLLS,
                };
                (
                    ProviderSettings::Mock { transition_polls },
                    Scope::new(
                        get("MOCK_PROJECT_ID").unwrap_or_else(|| "mock".to_string()),
                        get("MOCK_ZONE").unwrap_or_else(|| "mock-zone-1".to_string()),
                    ),
                )
            }
            other => bail!("unsupported PROVIDER '{}' (expected scaleway or mock)", other),
        };

        Ok(Self {
            bind_addr,
            provider,
            scope,
            poll,
        })
    }
}
