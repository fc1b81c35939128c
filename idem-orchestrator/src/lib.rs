// Instance power workflow: issue a start/stop action, then poll the provider
// until the instance settles on the expected lifecycle state.

pub mod poller;
pub mod workflow;

pub use poller::{PollPolicy, StatePoller};
pub use workflow::{Workflow, WorkflowError};

use tokio::sync::watch;

/// Create a cancellation pair. Sending `true` on the sender aborts any poll
/// waiting on a receiver clone.
pub fn cancel_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Resolves once the flag flips to `true`. A dropped sender can never cancel,
/// so in that case this never resolves.
pub(crate) async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|flag| *flag).await.is_err() {
        std::future::pending::<()>().await;
    }
}
