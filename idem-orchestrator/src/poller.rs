use std::sync::Arc;
use std::time::Duration;

use idem_common::{LifecycleState, ProgressEvent};
use idem_providers::CloudProvider;
use tokio::sync::{mpsc, watch};

use crate::workflow::WorkflowError;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Fixed-interval polling. `max_attempts = None` waits forever, which is only
/// acceptable when a human can cancel the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: None,
        }
    }
}

impl PollPolicy {
    pub fn bounded(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts.max(1)),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none()
    }
}

pub struct StatePoller {
    provider: Arc<dyn CloudProvider>,
    policy: PollPolicy,
}

impl StatePoller {
    pub fn new(provider: Arc<dyn CloudProvider>, policy: PollPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Read the state until it equals `target`. Returns the number of reads it took.
    ///
    /// The first read happens immediately. A provider error ends the wait on the
    /// spot; there is no retry-on-error. When the attempt cap is hit the wait
    /// fails without sleeping again.
    pub async fn wait_for_state(
        &self,
        instance_id: &str,
        target: &LifecycleState,
        progress: &mpsc::UnboundedSender<ProgressEvent>,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<u32, WorkflowError> {
        let mut attempt: u32 = 0;
        loop {
            if *cancel.borrow() {
                return Err(WorkflowError::Cancelled {
                    instance_id: instance_id.to_string(),
                });
            }

            attempt += 1;
            let current = self.provider.get_state(instance_id).await.map_err(|e| {
                tracing::warn!(
                    "[poller] {} read #{} failed, giving up: {}",
                    instance_id,
                    attempt,
                    e
                );
                WorkflowError::Provider(e)
            })?;

            if &current == target {
                tracing::debug!("[poller] {} reached {} after {} read(s)", instance_id, target, attempt);
                return Ok(attempt);
            }

            if let Some(max) = self.policy.max_attempts {
                if attempt >= max {
                    return Err(WorkflowError::Timeout {
                        instance_id: instance_id.to_string(),
                        target: target.clone(),
                        attempts: attempt,
                    });
                }
            }

            tracing::info!(
                "[poller] Waiting for {} to be {} (currently {}, read #{})",
                instance_id,
                target,
                current,
                attempt
            );
            let _ = progress.send(ProgressEvent::Waiting {
                instance_id: instance_id.to_string(),
                current,
                target: target.clone(),
                attempt,
            });

            tokio::select! {
                biased;
                _ = crate::cancelled(cancel) => {
                    return Err(WorkflowError::Cancelled {
                        instance_id: instance_id.to_string(),
                    });
                }
                _ = tokio::time::sleep(self.policy.interval) => {}
            }
        }
    }
}
