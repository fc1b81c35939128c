use std::sync::Arc;

use idem_common::{ActionRequest, InstanceRecord, LifecycleState, ProgressEvent, Verb};
use idem_providers::{CloudProvider, ProviderError};
use tokio::sync::{mpsc, watch};

use crate::poller::{PollPolicy, StatePoller};

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("instance {instance_id} did not reach {target} after {attempts} check(s)")]
    Timeout {
        instance_id: String,
        target: LifecycleState,
        attempts: u32,
    },
    #[error("cannot {verb} instance {instance_id}: it is {current}, expected {}", .verb.source_state())]
    InvalidTransition {
        instance_id: String,
        verb: Verb,
        current: LifecycleState,
    },
    #[error("wait for instance {instance_id} was cancelled")]
    Cancelled { instance_id: String },
}

/// Start/stop orchestration: one action call followed by one polling wait.
///
/// Every step is reported on the progress channel; failures are also returned,
/// the caller decides how to render them.
pub struct Workflow {
    provider: Arc<dyn CloudProvider>,
    poller: StatePoller,
    progress: mpsc::UnboundedSender<ProgressEvent>,
    cancel: watch::Receiver<bool>,
}

impl Workflow {
    pub fn new(
        provider: Arc<dyn CloudProvider>,
        policy: PollPolicy,
        progress: mpsc::UnboundedSender<ProgressEvent>,
    ) -> Self {
        // Sender dropped right away: this receiver can never fire.
        let (_, cancel) = watch::channel(false);
        Self {
            poller: StatePoller::new(provider.clone(), policy),
            provider,
            progress,
            cancel,
        }
    }

    pub fn with_cancel(mut self, cancel: watch::Receiver<bool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub async fn execute(&self, instance: &InstanceRecord, verb: Verb) -> Result<(), WorkflowError> {
        let request = ActionRequest::new(instance.id.as_str(), verb);

        if instance.lifecycle_state != verb.source_state() {
            let err = WorkflowError::InvalidTransition {
                instance_id: request.instance_id.clone(),
                verb,
                current: instance.lifecycle_state.clone(),
            };
            self.fail(instance, &err, false);
            return Err(err);
        }

        self.notify(ProgressEvent::ActionStarting {
            instance_id: request.instance_id.clone(),
            display_name: instance.display_name.clone(),
            verb,
        });

        if let Err(e) = self.provider.perform_action(&request.instance_id, verb).await {
            let err = WorkflowError::Provider(e);
            self.fail(instance, &err, false);
            return Err(err);
        }
        self.notify(ProgressEvent::ActionAccepted {
            instance_id: request.instance_id.clone(),
            verb,
        });

        let mut cancel = self.cancel.clone();
        match self
            .poller
            .wait_for_state(&request.instance_id, &request.target_state, &self.progress, &mut cancel)
            .await
        {
            Ok(attempts) => {
                tracing::info!(
                    "[workflow] {} {} finished after {} check(s) via {}",
                    verb,
                    request.instance_id,
                    attempts,
                    self.provider.name()
                );
                self.notify(ProgressEvent::Completed {
                    instance_id: request.instance_id,
                    display_name: instance.display_name.clone(),
                    state: request.target_state,
                });
                Ok(())
            }
            Err(err) => {
                self.fail(instance, &err, true);
                Err(err)
            }
        }
    }

    fn notify(&self, event: ProgressEvent) {
        tracing::info!("[workflow] {}", event.message());
        // Nobody listening is fine; the result still carries the outcome.
        let _ = self.progress.send(event);
    }

    fn fail(&self, instance: &InstanceRecord, err: &WorkflowError, action_accepted: bool) {
        let message = if action_accepted {
            format!(
                "{}. The action was accepted, so the instance may be left mid-transition; check it manually",
                err
            )
        } else {
            err.to_string()
        };
        tracing::error!("[workflow] {} on {} failed: {}", instance.display_name, instance.id, message);
        let _ = self.progress.send(ProgressEvent::Failed {
            instance_id: instance.id.clone(),
            display_name: instance.display_name.clone(),
            message,
        });
    }
}
