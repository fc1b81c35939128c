// Common test utilities and fixtures
use async_trait::async_trait;
use axum_test::TestServer;
use idem_api::app::{build_app, AppState};
use idem_common::{InstanceRecord, LifecycleState, Verb};
use idem_orchestrator::PollPolicy;
use idem_providers::mock::MockProvider;
use idem_providers::{CloudProvider, ProviderError, Scope};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// Demo fleet: `mock-1` web-1 RUNNING, `mock-2` worker-1 STOPPED, `mock-3` batch-1 STOPPED.
pub fn create_test_server(transition_polls: u32, poll: PollPolicy) -> (TestServer, Arc<AppState>) {
    let provider = Arc::new(MockProvider::with_demo_instances(transition_polls));
    let state = AppState::new(provider, Scope::new("mock", "mock-zone-1"), poll);
    let server = TestServer::new(build_app(state.clone())).expect("test server");
    (server, state)
}

/// Provider whose every call fails with a 503 carrying `message`.
pub struct FailingProvider {
    pub message: String,
}

impl FailingProvider {
    fn error(&self) -> ProviderError {
        ProviderError::Api {
            status: 503,
            message: self.message.clone(),
        }
    }
}

#[async_trait]
impl CloudProvider for FailingProvider {
    fn name(&self) -> &'static str {
        "failing"
    }

    async fn list_instances(&self, _scope: &Scope) -> Result<Vec<InstanceRecord>, ProviderError> {
        Err(self.error())
    }

    async fn get_state(&self, _instance_id: &str) -> Result<LifecycleState, ProviderError> {
        Err(self.error())
    }

    async fn perform_action(&self, _instance_id: &str, _verb: Verb) -> Result<(), ProviderError> {
        Err(self.error())
    }
}

#[allow(dead_code)]
pub fn create_failing_server(message: &str) -> TestServer {
    let provider = Arc::new(FailingProvider {
        message: message.to_string(),
    });
    let state = AppState::new(provider, Scope::new("mock", "mock-zone-1"), fast_poll());
    TestServer::new(build_app(state)).expect("test server")
}

/// Fast polling so jobs settle within a test.
pub fn fast_poll() -> PollPolicy {
    PollPolicy::bounded(Duration::from_millis(10), 50)
}

/// Poll `GET /jobs/{id}` until the job leaves `running`.
pub async fn wait_for_job(server: &TestServer, job_id: &str) -> Value {
    for _ in 0..300 {
        let job: Value = server.get(&format!("/jobs/{}", job_id)).await.json();
        if job["status"] != "running" {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("job {} never finished", job_id);
}
