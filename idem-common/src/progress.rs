use serde::Serialize;

use crate::{LifecycleState, Verb};

/// Operator-facing progress emitted while an action runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    ActionStarting {
        instance_id: String,
        display_name: String,
        verb: Verb,
    },
    /// The provider accepted the request; the transition is now underway.
    ActionAccepted {
        instance_id: String,
        verb: Verb,
    },
    Waiting {
        instance_id: String,
        current: LifecycleState,
        target: LifecycleState,
        attempt: u32,
    },
    Completed {
        instance_id: String,
        display_name: String,
        state: LifecycleState,
    },
    Failed {
        instance_id: String,
        display_name: String,
        message: String,
    },
}

impl ProgressEvent {
    pub fn instance_id(&self) -> &str {
        match self {
            Self::ActionStarting { instance_id, .. }
            | Self::ActionAccepted { instance_id, .. }
            | Self::Waiting { instance_id, .. }
            | Self::Completed { instance_id, .. }
            | Self::Failed { instance_id, .. } => instance_id,
        }
    }

    /// Human readable line, as the dashboard shows it.
    pub fn message(&self) -> String {
        match self {
            Self::ActionStarting {
                display_name, verb, ..
            } => match verb {
                Verb::Start => format!("Starting the instance [{}]...", display_name),
                Verb::Stop => format!("Stopping the instance [{}]...", display_name),
            },
            Self::ActionAccepted { instance_id, verb } => {
                format!("Provider accepted '{}' for instance {}", verb, instance_id)
            }
            Self::Waiting {
                current,
                target,
                attempt,
                ..
            } => format!(
                "Waiting for the instance state to be: {} (currently {}, check #{})",
                target, current, attempt
            ),
            Self::Completed {
                display_name,
                state,
                ..
            } => format!("Instance [{}] is now {}!", display_name, state),
            Self::Failed {
                display_name,
                message,
                ..
            } => format!("Action on instance [{}] failed: {}", display_name, message),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = ProgressEvent::Waiting {
            instance_id: "i-1".to_string(),
            current: LifecycleState::Starting,
            target: LifecycleState::Running,
            attempt: 2,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "waiting");
        assert_eq!(json["current"], "STARTING");
        assert_eq!(json["target"], "RUNNING");
        assert!(!event.is_terminal());
    }

    #[test]
    fn completion_message_names_instance_and_state() {
        let event = ProgressEvent::Completed {
            instance_id: "i-1".to_string(),
            display_name: "web-1".to_string(),
            state: LifecycleState::Running,
        };
        assert_eq!(event.message(), "Instance [web-1] is now RUNNING!");
        assert_eq!(event.instance_id(), "i-1");
        assert!(event.is_terminal());
    }
}
