use crate::{CloudProvider, ProviderError, Scope};
use async_trait::async_trait;
use chrono::Utc;
use idem_common::{InstanceRecord, LifecycleState, Verb};
use std::collections::BTreeMap;
use std::sync::Mutex;

/// In-memory provider for local runs and tests.
///
/// An accepted action moves the instance into its transient state (`STARTING`
/// / `STOPPING`) and it settles on the target after `transition_polls` reads of
/// `get_state`, which is how a real provider looks to the poller.
pub struct MockProvider {
    instances: Mutex<BTreeMap<String, MockInstance>>,
    transition_polls: u32,
}

struct MockInstance {
    record: InstanceRecord,
    pending: Option<PendingTransition>,
}

struct PendingTransition {
    target: LifecycleState,
    remaining_polls: u32,
}

impl MockProvider {
    pub fn new(transition_polls: u32) -> Self {
        Self {
            instances: Mutex::new(BTreeMap::new()),
            transition_polls,
        }
    }

    /// A provider pre-seeded with a small fleet, one per stable state.
    pub fn with_demo_instances(transition_polls: u32) -> Self {
        let provider = Self::new(transition_polls);
        let now = Utc::now();
        for (id, name, memory_gb, vcpus, state) in [
            ("mock-1", "web-1", 16.0, 4, LifecycleState::Running),
            ("mock-2", "worker-1", 32.0, 8, LifecycleState::Stopped),
            ("mock-3", "batch-1", 8.0, 2, LifecycleState::Stopped),
        ] {
            provider.insert(InstanceRecord {
                id: id.to_string(),
                display_name: name.to_string(),
                memory_gb,
                vcpu_count: vcpus,
                created_at: Some(now),
                lifecycle_state: state,
            });
        }
        provider
    }

    pub fn insert(&self, record: InstanceRecord) {
        if let Ok(mut instances) = self.instances.lock() {
            instances.insert(
                record.id.clone(),
                MockInstance {
                    record,
                    pending: None,
                },
            );
        }
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<String, MockInstance>>, ProviderError> {
        self.instances
            .lock()
            .map_err(|_| ProviderError::Malformed("mock provider state poisoned".to_string()))
    }
}

#[async_trait]
impl CloudProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_instances(&self, scope: &Scope) -> Result<Vec<InstanceRecord>, ProviderError> {
        let instances = self.lock()?;
        tracing::debug!(
            "[Mock provider] list_instances project={} zone={} count={}",
            scope.project_id,
            scope.zone,
            instances.len()
        );
        Ok(instances.values().map(|i| i.record.clone()).collect())
    }

    async fn get_state(&self, instance_id: &str) -> Result<LifecycleState, ProviderError> {
        let mut instances = self.lock()?;
        let instance = instances
            .get_mut(instance_id)
            .ok_or_else(|| ProviderError::NotFound(instance_id.to_string()))?;

        if let Some(pending) = instance.pending.as_mut() {
            pending.remaining_polls = pending.remaining_polls.saturating_sub(1);
            if pending.remaining_polls == 0 {
                instance.record.lifecycle_state = pending.target.clone();
                instance.pending = None;
            }
        }
        Ok(instance.record.lifecycle_state.clone())
    }

    async fn perform_action(&self, instance_id: &str, verb: Verb) -> Result<(), ProviderError> {
        let mut instances = self.lock()?;
        let instance = instances
            .get_mut(instance_id)
            .ok_or_else(|| ProviderError::NotFound(instance_id.to_string()))?;

        let current = &instance.record.lifecycle_state;
        if *current != verb.source_state() {
            return Err(ProviderError::Api {
                status: 400,
                message: format!(
                    "cannot {} instance {} in state {}",
                    verb, instance_id, current
                ),
            });
        }

        tracing::info!("[Mock provider] {} accepted for {}", verb, instance_id);
        if self.transition_polls == 0 {
            instance.record.lifecycle_state = verb.target_state();
            return Ok(());
        }
        instance.record.lifecycle_state = match verb {
            Verb::Start => LifecycleState::Starting,
            Verb::Stop => LifecycleState::Stopping,
        };
        instance.pending = Some(PendingTransition {
            target: verb.target_state(),
            remaining_polls: self.transition_polls,
        });
        Ok(())
    }
}
