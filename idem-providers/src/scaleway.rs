use crate::{CloudProvider, ProviderError, Scope};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use idem_common::{InstanceRecord, LifecycleState, Verb};
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

const API_BASE: &str = "https://api.scaleway.com/instance/v1";

/// Credentials and default zone for the Scaleway Instance API.
#[derive(Debug, Clone)]
pub struct ScalewaySettings {
    pub secret_key: String,
    pub zone: String,
}

/// Shape of a commercial type, from the products catalog.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub memory_gb: f64,
    pub vcpu_count: u32,
}

pub struct ScalewayProvider {
    client: Client,
    api_base: String,
    secret_key: String,
    zone: String,
}

impl ScalewayProvider {
    pub fn new(settings: ScalewaySettings) -> Result<Self, ProviderError> {
        // Default reqwest client has no overall timeout. If Scaleway stalls, a poll can hang forever.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(20))
            .build()?;
        Ok(Self {
            client,
            api_base: API_BASE.to_string(),
            secret_key: settings.secret_key.trim().to_string(),
            zone: settings.zone.trim().to_string(),
        })
    }

    /// Point the provider at another endpoint (staging or a local fake).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn headers(&self) -> Result<reqwest::header::HeaderMap, ProviderError> {
        let mut headers = reqwest::header::HeaderMap::new();
        let token = reqwest::header::HeaderValue::from_str(&self.secret_key)
            .map_err(|_| ProviderError::Malformed("secret key is not a valid header value".to_string()))?;
        headers.insert("X-Auth-Token", token);
        headers.insert(
            reqwest::header::CONTENT_TYPE,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        Ok(headers)
    }

    /// Ids are handed out zone-qualified (`fr-par-2/<uuid>`), the same way the
    /// Scaleway CLI prints them. Bare ids fall back to the configured zone.
    fn split_id<'a>(&'a self, instance_id: &'a str) -> (&'a str, &'a str) {
        match instance_id.split_once('/') {
            Some((zone, server_id)) if !zone.is_empty() => (zone, server_id),
            _ => (self.zone.as_str(), instance_id),
        }
    }

    async fn fetch_shapes(&self, zone: &str) -> Result<HashMap<String, Shape>, ProviderError> {
        let url = format!("{}/zones/{}/products/servers", self.api_base, zone);
        let resp = self.client.get(&url).headers(self.headers()?).send().await?;
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(parse_catalog(&body))
    }

    async fn error_from(resp: reqwest::Response, url: &str) -> ProviderError {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        tracing::error!(
            "[Scaleway API] {} failed: status={}, response={}",
            url,
            status,
            text
        );
        ProviderError::Api {
            status,
            message: api_message(&text),
        }
    }
}

#[async_trait]
impl CloudProvider for ScalewayProvider {
    fn name(&self) -> &'static str {
        "scaleway"
    }

    async fn list_instances(&self, scope: &Scope) -> Result<Vec<InstanceRecord>, ProviderError> {
        // Shapes are cosmetic; a catalog failure must not hide the instance list.
        let shapes = match self.fetch_shapes(&scope.zone).await {
            Ok(shapes) => shapes,
            Err(e) => {
                tracing::warn!(
                    "[Scaleway API] products catalog unavailable for zone {}: {}",
                    scope.zone,
                    e
                );
                HashMap::new()
            }
        };

        let url = format!("{}/zones/{}/servers", self.api_base, scope.zone);
        tracing::info!(
            "[Scaleway API] GET {} - Listing servers: project={}",
            url,
            scope.project_id
        );
        let resp = self
            .client
            .get(&url)
            .headers(self.headers()?)
            .query(&[("project", scope.project_id.as_str()), ("per_page", "100")])
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(Self::error_from(resp, &url).await);
        }

        let body: serde_json::Value = resp.json().await?;
        let servers = body["servers"]
            .as_array()
            .ok_or_else(|| ProviderError::Malformed("no 'servers' array in response".to_string()))?;

        let records = servers
            .iter()
            .map(|server| parse_server(server, &scope.zone, &shapes))
            .collect::<Result<Vec<_>, _>>()?;
        tracing::info!(
            "[Scaleway API] GET {} succeeded: {} server(s)",
            url,
            records.len()
        );
        Ok(records)
    }

    async fn get_state(&self, instance_id: &str) -> Result<LifecycleState, ProviderError> {
        let (zone, server_id) = self.split_id(instance_id);
        let url = format!("{}/zones/{}/servers/{}", self.api_base, zone, server_id);
        tracing::debug!("[Scaleway API] GET {} - Getting server state", url);

        let resp = self.client.get(&url).headers(self.headers()?).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(instance_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Self::error_from(resp, &url).await);
        }

        let body: serde_json::Value = resp.json().await?;
        let state = body["server"]["state"]
            .as_str()
            .ok_or_else(|| ProviderError::Malformed(format!("no state for server {}", server_id)))?;
        tracing::debug!("[Scaleway API] server {} state={}", server_id, state);
        Ok(LifecycleState::parse(state))
    }

    async fn perform_action(&self, instance_id: &str, verb: Verb) -> Result<(), ProviderError> {
        let (zone, server_id) = self.split_id(instance_id);
        let url = format!("{}/zones/{}/servers/{}/action", self.api_base, zone, server_id);
        let body = json!({ "action": action_name(verb) });

        tracing::info!(
            "[Scaleway API] POST {} - {}: server_id={}, zone={}",
            url,
            action_name(verb),
            server_id,
            zone
        );
        let resp = self
            .client
            .post(&url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound(instance_id.to_string()));
        }
        if !resp.status().is_success() {
            return Err(Self::error_from(resp, &url).await);
        }
        tracing::info!("[Scaleway API] POST {} succeeded: status={}", url, resp.status().as_u16());
        Ok(())
    }
}

fn action_name(verb: Verb) -> &'static str {
    match verb {
        Verb::Start => "poweron",
        Verb::Stop => "poweroff",
    }
}

/// Scaleway errors come back as `{"message": "...", "type": "..."}`.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["message"].as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| body.to_string())
}

fn parse_catalog(body: &serde_json::Value) -> HashMap<String, Shape> {
    let mut shapes = HashMap::new();
    if let Some(servers) = body.get("servers").and_then(|v| v.as_object()) {
        for (code, details) in servers {
            let ram_bytes = details["ram"].as_u64().unwrap_or(0);
            shapes.insert(
                code.clone(),
                Shape {
                    memory_gb: ram_bytes as f64 / 1024.0 / 1024.0 / 1024.0,
                    vcpu_count: details["ncpus"].as_u64().unwrap_or(0) as u32,
                },
            );
        }
    }
    shapes
}

fn parse_server(
    server: &serde_json::Value,
    zone: &str,
    shapes: &HashMap<String, Shape>,
) -> Result<InstanceRecord, ProviderError> {
    let id = server["id"]
        .as_str()
        .ok_or_else(|| ProviderError::Malformed("server without id".to_string()))?;
    let state = server["state"].as_str().unwrap_or("unknown");
    let shape = server["commercial_type"]
        .as_str()
        .and_then(|ct| shapes.get(ct))
        .copied()
        .unwrap_or(Shape {
            memory_gb: 0.0,
            vcpu_count: 0,
        });
    let created_at = server["creation_date"]
        .as_str()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(InstanceRecord {
        id: format!("{}/{}", zone, id),
        display_name: server["name"].as_str().unwrap_or(id).to_string(),
        memory_gb: shape.memory_gb,
        vcpu_count: shape.vcpu_count,
        created_at,
        lifecycle_state: LifecycleState::parse(state),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> ScalewayProvider {
        ScalewayProvider::new(ScalewaySettings {
            secret_key: "k".to_string(),
            zone: "fr-par-2".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn catalog_converts_ram_to_gb() {
        let body = json!({
            "servers": {
                "DEV1-M": { "ncpus": 3, "ram": 4294967296u64 },
                "GP1-XS": { "ncpus": 4, "ram": 17179869184u64 }
            }
        });
        let shapes = parse_catalog(&body);
        assert_eq!(shapes["DEV1-M"], Shape { memory_gb: 4.0, vcpu_count: 3 });
        assert_eq!(shapes["GP1-XS"].memory_gb, 16.0);
    }

    #[test]
    fn server_is_mapped_to_zoned_record() {
        let mut shapes = HashMap::new();
        shapes.insert("DEV1-M".to_string(), Shape { memory_gb: 4.0, vcpu_count: 3 });
        let server = json!({
            "id": "11111111-2222-3333-4444-555555555555",
            "name": "web-1",
            "commercial_type": "DEV1-M",
            "state": "stopped in place",
            "creation_date": "2024-05-02T10:11:12.000000+00:00"
        });

        let record = parse_server(&server, "fr-par-2", &shapes).unwrap();
        assert_eq!(record.id, "fr-par-2/11111111-2222-3333-4444-555555555555");
        assert_eq!(record.display_name, "web-1");
        assert_eq!(record.vcpu_count, 3);
        assert_eq!(record.lifecycle_state, LifecycleState::Stopped);
        assert!(record.created_at.is_some());
    }

    #[test]
    fn server_without_id_is_malformed() {
        let err = parse_server(&json!({ "name": "x" }), "fr-par-2", &HashMap::new()).unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }

    #[test]
    fn ids_fall_back_to_configured_zone() {
        let p = provider();
        assert_eq!(p.split_id("nl-ams-1/abc"), ("nl-ams-1", "abc"));
        assert_eq!(p.split_id("abc"), ("fr-par-2", "abc"));
    }

    #[test]
    fn api_message_prefers_json_message() {
        assert_eq!(
            api_message(r#"{"message":"resource is locked","type":"locked"}"#),
            "resource is locked"
        );
        assert_eq!(api_message("plain failure"), "plain failure");
        assert_eq!(action_name(Verb::Start), "poweron");
        assert_eq!(action_name(Verb::Stop), "poweroff");
    }
}
