pub mod client;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::backend::events::AgentState;
use crate::backend::{AgentRuntime, FakeUserResponseFn, RunState, RuntimeConfig, UserMessage};
use crate::config::OpenHandsConfig;

use client::{terminal_state, OpenHandsClient};

/// OpenHands runtime that drives the headless OpenHands CLI.
///
/// When a run stops because the agent asked a question, the same session is
/// relaunched with the reply produced by the fake-user callback, up to
/// `max_continuations` times. Histories of all runs are concatenated.
pub struct OpenHandsRuntime {
    id: String,
    client: OpenHandsClient,
}

impl OpenHandsRuntime {
    pub fn new() -> Self {
        Self::with_config(OpenHandsConfig::default())
    }

    pub fn with_config(config: OpenHandsConfig) -> Self {
        Self {
            id: "openhands".to_string(),
            client: OpenHandsClient::with_config(config),
        }
    }

    pub fn config(&self) -> &OpenHandsConfig {
        self.client.config()
    }
}

impl Default for OpenHandsRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AgentRuntime for OpenHandsRuntime {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run_controller(
        &self,
        config: &RuntimeConfig,
        initial_user_action: UserMessage,
        session_id: &str,
        fake_user_response: FakeUserResponseFn,
    ) -> anyhow::Result<Option<RunState>> {
        let max_continuations = self.config().max_continuations;
        let mut task = initial_user_action.content;
        let mut state: Option<RunState> = None;
        let mut attempt = 0u32;

        loop {
            let Some(run) = self
                .client
                .execute_task(config, &task, session_id, attempt)
                .await?
            else {
                break;
            };

            let agent_state = terminal_state(&run.history, run.exit_success);
            info!(
                "OpenHands run finished: session_id={}, attempt={}, state={}, events={}",
                session_id,
                attempt,
                agent_state,
                run.history.len()
            );

            let merged = match state.take() {
                Some(mut previous) => {
                    previous.history.extend(run.history);
                    previous.agent_state = agent_state;
                    previous
                }
                None => RunState {
                    agent_state,
                    history: run.history,
                },
            };

            if merged.agent_state != AgentState::AwaitingUserInput
                || attempt >= max_continuations
            {
                state = Some(merged);
                break;
            }

            task = fake_user_response(&merged);
            state = Some(merged);
            attempt += 1;
            debug!("Resuming session {} with fake user reply", session_id);
        }

        Ok(state)
    }
}
