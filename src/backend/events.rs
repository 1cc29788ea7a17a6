use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;
use serde_json::Value;

/// Lifecycle state reported by the agent controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentState {
    Loading,
    Running,
    AwaitingUserInput,
    Paused,
    Stopped,
    Finished,
    Rejected,
    Error,
    RateLimited,
    AwaitingUserConfirmation,
    UserConfirmed,
    UserRejected,
    /// Any state this crate does not know about.
    Unknown,
}

impl AgentState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Running => "running",
            Self::AwaitingUserInput => "awaiting_user_input",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
            Self::Finished => "finished",
            Self::Rejected => "rejected",
            Self::Error => "error",
            Self::RateLimited => "rate_limited",
            Self::AwaitingUserConfirmation => "awaiting_user_confirmation",
            Self::UserConfirmed => "user_confirmed",
            Self::UserRejected => "user_rejected",
            Self::Unknown => "unknown",
        }
    }

    /// Parse a state name, mapping unrecognised names to [`AgentState::Unknown`].
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "loading" => Self::Loading,
            "running" => Self::Running,
            "awaiting_user_input" => Self::AwaitingUserInput,
            "paused" => Self::Paused,
            "stopped" => Self::Stopped,
            "finished" => Self::Finished,
            "rejected" => Self::Rejected,
            "error" => Self::Error,
            "rate_limited" => Self::RateLimited,
            "awaiting_user_confirmation" => Self::AwaitingUserConfirmation,
            "user_confirmed" => Self::UserConfirmed,
            "user_rejected" => Self::UserRejected,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Runtime-agnostic history events.
///
/// Only the kinds the harvester or the runtime adapter actually read get a
/// variant; everything else lands in `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    /// The agent edited a file in place.
    FileEdit { path: String },
    /// The agent wrote a whole file.
    FileWrite { path: String },
    /// A chat message from the agent or the user.
    Message {
        source: Option<String>,
        content: String,
        wait_for_response: bool,
    },
    /// The agent declared the task done.
    Finish { message: Option<String> },
    /// The controller moved to a new state.
    AgentStateChanged { agent_state: AgentState },
    /// An error observation.
    Error { content: String },
    /// Any other action or observation kind.
    Other { kind: String },
}

impl HistoryEvent {
    /// Path carried by file-edit and file-write events.
    pub fn file_path(&self) -> Option<&str> {
        match self {
            Self::FileEdit { path } | Self::FileWrite { path } => Some(path),
            _ => None,
        }
    }
}

/// One serialized event as written to an OpenHands trajectory file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrajectoryEntry {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub observation: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub args: HashMap<String, Value>,
    #[serde(default)]
    pub extras: HashMap<String, Value>,
}

impl TrajectoryEntry {
    fn arg_str(&self, key: &str) -> Option<String> {
        self.args
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

impl From<TrajectoryEntry> for HistoryEvent {
    fn from(entry: TrajectoryEntry) -> Self {
        if let Some(action) = entry.action.as_deref() {
            return match action {
                "edit" => match entry.arg_str("path") {
                    Some(path) => HistoryEvent::FileEdit { path },
                    None => HistoryEvent::Other {
                        kind: action.to_string(),
                    },
                },
                "write" => match entry.arg_str("path") {
                    Some(path) => HistoryEvent::FileWrite { path },
                    None => HistoryEvent::Other {
                        kind: action.to_string(),
                    },
                },
                "message" => HistoryEvent::Message {
                    source: entry.source.clone(),
                    content: entry.arg_str("content").unwrap_or_default(),
                    wait_for_response: entry
                        .args
                        .get("wait_for_response")
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false),
                },
                "finish" => HistoryEvent::Finish {
                    message: entry
                        .arg_str("final_thought")
                        .or_else(|| entry.arg_str("thought")),
                },
                other => HistoryEvent::Other {
                    kind: other.to_string(),
                },
            };
        }

        match entry.observation.as_deref() {
            Some("agent_state_changed") => {
                let agent_state = entry
                    .extras
                    .get("agent_state")
                    .and_then(|v| v.as_str())
                    .map(AgentState::parse)
                    .unwrap_or(AgentState::Unknown);
                HistoryEvent::AgentStateChanged { agent_state }
            }
            Some("error") => HistoryEvent::Error {
                content: entry.content.unwrap_or_default(),
            },
            Some(other) => HistoryEvent::Other {
                kind: other.to_string(),
            },
            None => HistoryEvent::Other {
                kind: "unknown".to_string(),
            },
        }
    }
}
