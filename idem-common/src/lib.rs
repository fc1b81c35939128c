use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod progress;

pub use progress::ProgressEvent;

// --- Enums ---

/// Lifecycle state of a compute instance as reported by the provider.
///
/// Only `Running` and `Stopped` drive actions; the transient states are kept so
/// the dashboard can show them, and anything unrecognised is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Provisioning,
    Starting,
    Running,
    Stopping,
    Stopped,
    Terminating,
    Terminated,
    Unknown(String),
}

impl LifecycleState {
    /// Case-insensitive parse. Provider spellings such as `stopped in place`
    /// collapse onto `Stopped`.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        match normalized.as_str() {
            "provisioning" | "creating" => Self::Provisioning,
            "starting" => Self::Starting,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" | "stopped_in_place" => Self::Stopped,
            "terminating" | "deleting" => Self::Terminating,
            "terminated" | "deleted" => Self::Terminated,
            _ => Self::Unknown(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Provisioning => "PROVISIONING",
            Self::Starting => "STARTING",
            Self::Running => "RUNNING",
            Self::Stopping => "STOPPING",
            Self::Stopped => "STOPPED",
            Self::Terminating => "TERMINATING",
            Self::Terminated => "TERMINATED",
            Self::Unknown(raw) => raw.as_str(),
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for LifecycleState {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LifecycleState {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Power action an operator can request on an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Start,
    Stop,
}

impl Verb {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "start" | "poweron" => Some(Self::Start),
            "stop" | "poweroff" => Some(Self::Stop),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
        }
    }

    /// State the instance must be in before the action is allowed.
    pub fn source_state(&self) -> LifecycleState {
        match self {
            Self::Start => LifecycleState::Stopped,
            Self::Stop => LifecycleState::Running,
        }
    }

    /// State the provider reports once the action has completed.
    pub fn target_state(&self) -> LifecycleState {
        match self {
            Self::Start => LifecycleState::Running,
            Self::Stop => LifecycleState::Stopped,
        }
    }

    /// The single action offered for an instance in `state`, if any.
    pub fn available_for(state: &LifecycleState) -> Option<Self> {
        match state {
            LifecycleState::Stopped => Some(Self::Start),
            LifecycleState::Running => Some(Self::Stop),
            _ => None,
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Entities ---

/// Snapshot of a compute instance at listing time. Rebuilt on every listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: String,
    pub display_name: String,
    pub memory_gb: f64,
    pub vcpu_count: u32,
    pub created_at: Option<DateTime<Utc>>,
    pub lifecycle_state: LifecycleState,
}

impl InstanceRecord {
    pub fn available_actions(&self) -> Vec<Verb> {
        Verb::available_for(&self.lifecycle_state).into_iter().collect()
    }
}

/// One requested transition; lives only for the duration of a workflow run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    pub instance_id: String,
    pub verb: Verb,
    pub target_state: LifecycleState,
}

impl ActionRequest {
    pub fn new(instance_id: impl Into<String>, verb: Verb) -> Self {
        Self {
            instance_id: instance_id.into(),
            verb,
            target_state: verb.target_state(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_parse_is_case_insensitive() {
        assert_eq!(LifecycleState::parse("RUNNING"), LifecycleState::Running);
        assert_eq!(LifecycleState::parse("running"), LifecycleState::Running);
        assert_eq!(LifecycleState::parse("stopped in place"), LifecycleState::Stopped);
        assert_eq!(LifecycleState::parse(" Stopping "), LifecycleState::Stopping);
        assert_eq!(
            LifecycleState::parse("locked"),
            LifecycleState::Unknown("locked".to_string())
        );
        assert_eq!(LifecycleState::parse("locked").as_str(), "locked");
    }

    #[test]
    fn only_stable_states_offer_an_action() {
        assert_eq!(Verb::available_for(&LifecycleState::Stopped), Some(Verb::Start));
        assert_eq!(Verb::available_for(&LifecycleState::Running), Some(Verb::Stop));
        for state in [
            LifecycleState::Provisioning,
            LifecycleState::Starting,
            LifecycleState::Stopping,
            LifecycleState::Terminating,
            LifecycleState::Terminated,
            LifecycleState::Unknown("moving".to_string()),
        ] {
            assert_eq!(Verb::available_for(&state), None, "{state}");
        }
    }

    #[test]
    fn verb_states_are_mirrored() {
        assert_eq!(Verb::Start.source_state(), Verb::Stop.target_state());
        assert_eq!(Verb::Stop.source_state(), Verb::Start.target_state());
        assert_eq!(Verb::parse("POWERON"), Some(Verb::Start));
        assert_eq!(Verb::parse("stop"), Some(Verb::Stop));
        assert_eq!(Verb::parse("reboot"), None);
    }

    #[test]
    fn action_request_carries_target_state() {
        let req = ActionRequest::new("i-1", Verb::Stop);
        assert_eq!(req.target_state, LifecycleState::Stopped);
    }

    #[test]
    fn instance_record_serializes_state_as_label() {
        let record = InstanceRecord {
            id: "i-1".to_string(),
            display_name: "web-1".to_string(),
            memory_gb: 16.0,
            vcpu_count: 4,
            created_at: None,
            lifecycle_state: LifecycleState::Stopped,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["lifecycle_state"], "STOPPED");
        assert_eq!(record.available_actions(), vec![Verb::Start]);
    }
}
