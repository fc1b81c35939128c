use idem_orchestrator::PollPolicy;
use idem_providers::{CloudProvider, Scope};
use std::sync::Arc;

use crate::jobs::ActionRunner;

#[derive(Clone)]
pub struct AppState {
    pub provider: Arc<dyn CloudProvider>,
    pub scope: Scope,
    pub runner: ActionRunner,
}

impl AppState {
    pub fn new(provider: Arc<dyn CloudProvider>, scope: Scope, poll: PollPolicy) -> Arc<Self> {
        let runner = ActionRunner::new(provider.clone(), poll);
        Arc::new(Self {
            provider,
            scope,
            runner,
        })
    }
}
