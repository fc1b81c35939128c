use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use idem_common::{InstanceRecord, ProgressEvent, Verb};
use idem_orchestrator::{cancel_channel, PollPolicy, Workflow, WorkflowError};
use idem_providers::CloudProvider;
use serde::Serialize;
use tokio::sync::{mpsc, watch, Mutex};
use uuid::Uuid;

/// Finished jobs kept around for the dashboard.
const MAX_FINISHED_JOBS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobEvent {
    pub at: DateTime<Utc>,
    /// Human-readable line for the job log. Kept apart from the event's own fields.
    pub text: String,
    #[serde(flatten)]
    pub event: ProgressEvent,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSnapshot {
    pub id: Uuid,
    pub instance_id: String,
    pub display_name: String,
    pub verb: Verb,
    pub status: JobStatus,
    pub events: Vec<JobEvent>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, thiserror::Error)]
pub enum SubmitError {
    #[error("another action is already running (job {0})")]
    Busy(Uuid),
    #[error(transparent)]
    Rejected(#[from] WorkflowError),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CancelError {
    #[error("job {0} not found")]
    NotFound(Uuid),
    #[error("job {0} already finished")]
    AlreadyFinished(Uuid),
}

struct JobEntry {
    snapshot: JobSnapshot,
    cancel: watch::Sender<bool>,
}

#[derive(Default)]
struct RunnerState {
    jobs: HashMap<Uuid, JobEntry>,
    active: Option<Uuid>,
}

/// Runs one power action at a time on a background task and records its
/// progress so the dashboard can follow it.
#[derive(Clone)]
pub struct ActionRunner {
    provider: Arc<dyn CloudProvider>,
    policy: PollPolicy,
    state: Arc<Mutex<RunnerState>>,
}

impl ActionRunner {
    pub fn new(provider: Arc<dyn CloudProvider>, policy: PollPolicy) -> Self {
        Self {
            provider,
            policy,
            state: Arc::new(Mutex::new(RunnerState::default())),
        }
    }

    /// Start `verb` on `instance`. Rejected up front when the instance is not in
    /// the source state, or while another job is still running.
    pub async fn submit(&self, instance: InstanceRecord, verb: Verb) -> Result<Uuid, SubmitError> {
        if Verb::available_for(&instance.lifecycle_state) != Some(verb) {
            return Err(SubmitError::Rejected(WorkflowError::InvalidTransition {
                instance_id: instance.id.clone(),
                verb,
                current: instance.lifecycle_state.clone(),
            }));
        }

        let mut state = self.state.lock().await;
        if let Some(active) = state.active {
            return Err(SubmitError::Busy(active));
        }
        prune_finished(&mut state.jobs);

        let job_id = Uuid::new_v4();
        let (cancel_tx, cancel_rx) = cancel_channel();
        state.jobs.insert(
            job_id,
            JobEntry {
                snapshot: JobSnapshot {
                    id: job_id,
                    instance_id: instance.id.clone(),
                    display_name: instance.display_name.clone(),
                    verb,
                    status: JobStatus::Running,
                    events: vec![],
                    error: None,
                    started_at: Utc::now(),
                    finished_at: None,
                },
                cancel: cancel_tx,
            },
        );
        state.active = Some(job_id);
        drop(state);

        tracing::info!(
            "[jobs] job {} started: {} {} ({})",
            job_id,
            verb,
            instance.display_name,
            instance.id
        );

        let (progress_tx, progress_rx) = mpsc::unbounded_channel();
        let workflow =
            Workflow::new(self.provider.clone(), self.policy, progress_tx).with_cancel(cancel_rx);
        let forwarder = tokio::spawn(forward_events(self.state.clone(), job_id, progress_rx));
        let runner_state = self.state.clone();

        tokio::spawn(async move {
            let result = workflow.execute(&instance, verb).await;
            // Dropping the workflow closes the progress channel so the forwarder drains and ends.
            drop(workflow);
            let _ = forwarder.await;
            finish(&runner_state, job_id, result).await;
        });

        Ok(job_id)
    }

    pub async fn cancel(&self, job_id: Uuid) -> Result<(), CancelError> {
        let state = self.state.lock().await;
        let entry = state.jobs.get(&job_id).ok_or(CancelError::NotFound(job_id))?;
        if entry.snapshot.status != JobStatus::Running {
            return Err(CancelError::AlreadyFinished(job_id));
        }
        tracing::info!("[jobs] cancellation requested for job {}", job_id);
        let _ = entry.cancel.send(true);
        Ok(())
    }

    pub async fn get(&self, job_id: Uuid) -> Option<JobSnapshot> {
        let state = self.state.lock().await;
        state.jobs.get(&job_id).map(|entry| entry.snapshot.clone())
    }

    /// Most recent first.
    pub async fn list(&self) -> Vec<JobSnapshot> {
        let state = self.state.lock().await;
        let mut jobs: Vec<JobSnapshot> = state.jobs.values().map(|e| e.snapshot.clone()).collect();
        jobs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        jobs
    }

    pub async fn active_job(&self) -> Option<Uuid> {
        self.state.lock().await.active
    }
}

async fn forward_events(
    state: Arc<Mutex<RunnerState>>,
    job_id: Uuid,
    mut progress: mpsc::UnboundedReceiver<ProgressEvent>,
) {
    while let Some(event) = progress.recv().await {
        let mut state = state.lock().await;
        if let Some(entry) = state.jobs.get_mut(&job_id) {
            entry.snapshot.events.push(JobEvent {
                at: Utc::now(),
                text: event.message(),
                event,
            });
        }
    }
}

async fn finish(state: &Mutex<RunnerState>, job_id: Uuid, result: Result<(), WorkflowError>) {
    let mut state = state.lock().await;
    if state.active == Some(job_id) {
        state.active = None;
    }
    let Some(entry) = state.jobs.get_mut(&job_id) else {
        return;
    };
    let (status, error) = match result {
        Ok(()) => (JobStatus::Succeeded, None),
        Err(WorkflowError::Cancelled { .. }) => (JobStatus::Cancelled, None),
        Err(e) => (JobStatus::Failed, Some(e.to_string())),
    };
    entry.snapshot.status = status;
    entry.snapshot.error = error;
    entry.snapshot.finished_at = Some(Utc::now());
    tracing::info!("[jobs] job {} finished: {:?}", job_id, status);
}

fn prune_finished(jobs: &mut HashMap<Uuid, JobEntry>) {
    let mut finished: Vec<(Uuid, DateTime<Utc>)> = jobs
        .iter()
        .filter(|(_, e)| e.snapshot.status != JobStatus::Running)
        .map(|(id, e)| (*id, e.snapshot.started_at))
        .collect();
    if finished.len() < MAX_FINISHED_JOBS {
        return;
    }
    finished.sort_by_key(|(_, started)| *started);
    let excess = finished.len() + 1 - MAX_FINISHED_JOBS;
    for (id, _) in finished.into_iter().take(excess) {
        jobs.remove(&id);
    }
}
