//! Seam between the harvester and the external agent runtime.
//!
//! The runtime owns the agent loop, the sandbox and the event history. This
//! module only describes what the harvester hands it (a [`RuntimeConfig`], an
//! initial [`UserMessage`], a session id and an auto-continue callback) and
//! what it hands back (a terminal [`RunState`]).

pub mod events;
pub mod openhands;

use std::fmt;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

pub use events::{AgentState, HistoryEvent, TrajectoryEntry};

/// Reply sent on behalf of the user whenever the agent asks a question.
pub const AUTO_CONTINUE_MESSAGE: &str = "Please continue working on the task on whatever approach you think is suitable.\n\
If you think you have solved the task, please finish the interaction.\n\
IMPORTANT: YOU SHOULD NEVER ASK FOR HUMAN RESPONSE.\n";

/// Where the runtime executes agent actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeMode {
    /// Directly on the host, inside the workspace directory.
    Local,
    Docker,
    Remote,
}

impl RuntimeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Docker => "docker",
            Self::Remote => "remote",
        }
    }
}

impl fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of runtime configuration the harvester controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub runtime: RuntimeMode,
    pub workspace_base: PathBuf,
    pub enable_browser: bool,
    pub confirmation_mode: bool,
}

impl RuntimeConfig {
    /// Unattended local execution rooted at `workspace`: no browser, no
    /// confirmation prompts, no container.
    pub fn headless(workspace: &Path) -> Self {
        Self {
            runtime: RuntimeMode::Local,
            workspace_base: workspace.to_path_buf(),
            enable_browser: false,
            confirmation_mode: false,
        }
    }
}

/// The initial instruction for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage {
    pub content: String,
}

impl UserMessage {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Final state of one agent run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub agent_state: AgentState,
    pub history: Vec<HistoryEvent>,
}

impl RunState {
    pub fn is_finished(&self) -> bool {
        self.agent_state == AgentState::Finished
    }
}

/// Produces the user's reply when the agent stops to ask a question.
pub type FakeUserResponseFn = fn(&RunState) -> String;

/// Always tell the agent to keep going without human input.
pub fn auto_continue_response(_state: &RunState) -> String {
    AUTO_CONTINUE_MESSAGE.to_string()
}

/// An external agent runtime that can drive one run to a terminal state.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    fn id(&self) -> &str;

    /// Allocate a fresh session identifier.
    fn generate_session_id(&self, _config: &RuntimeConfig) -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Run the agent until it reaches a terminal state.
    ///
    /// Returns `Ok(None)` when the runtime completed without producing any
    /// state at all.
    async fn run_controller(
        &self,
        config: &RuntimeConfig,
        initial_user_action: UserMessage,
        session_id: &str,
        fake_user_response: FakeUserResponseFn,
    ) -> anyhow::Result<Option<RunState>>;
}
