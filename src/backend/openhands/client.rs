use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::backend::events::{AgentState, HistoryEvent, TrajectoryEntry};
use crate::backend::RuntimeConfig;
use crate::config::OpenHandsConfig;
use crate::util::truncate_for_log;

/// Module run by the Python interpreter.
const OPENHANDS_ENTRY_MODULE: &str = "openhands.core.main";

/// Outcome of one OpenHands process run.
#[derive(Debug, Clone)]
pub struct TrajectoryRun {
    pub history: Vec<HistoryEvent>,
    pub exit_success: bool,
}

/// Client that launches the OpenHands headless entry point.
pub struct OpenHandsClient {
    config: OpenHandsConfig,
}

impl OpenHandsClient {
    pub fn new() -> Self {
        Self {
            config: OpenHandsConfig::default(),
        }
    }

    pub fn with_config(config: OpenHandsConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OpenHandsConfig {
        &self.config
    }

    /// Trajectory file for one run of a session.
    pub fn trajectory_path(&self, session_id: &str, attempt: u32) -> PathBuf {
        self.config
            .trajectory_dir
            .join(format!("openhands-{}-{}.json", session_id, attempt))
    }

    /// Run OpenHands once with `task` and read back its trajectory.
    ///
    /// Returns `Ok(None)` when the process left no trajectory behind.
    pub async fn execute_task(
        &self,
        runtime: &RuntimeConfig,
        task: &str,
        session_id: &str,
        attempt: u32,
    ) -> Result<Option<TrajectoryRun>> {
        let trajectory_path = self.trajectory_path(session_id, attempt);
        if tokio::fs::metadata(&trajectory_path).await.is_ok() {
            tokio::fs::remove_file(&trajectory_path)
                .await
                .with_context(|| {
                    format!(
                        "Failed to remove stale trajectory {}",
                        trajectory_path.display()
                    )
                })?;
        }

        let mut cmd = Command::new(&self.config.python_path);
        cmd.current_dir(&runtime.workspace_base)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .arg("-m")
            .arg(OPENHANDS_ENTRY_MODULE)
            // `=` form so tasks starting with '-' are not read as flags
            .arg(format!("--task={}", task))
            .arg(format!("--name={}", session_id))
            .env("RUNTIME", runtime.runtime.as_str())
            .env("WORKSPACE_BASE", &runtime.workspace_base)
            .env("ENABLE_BROWSER", runtime.enable_browser.to_string())
            .env(
                "SECURITY_CONFIRMATION_MODE",
                runtime.confirmation_mode.to_string(),
            )
            .env("SAVE_TRAJECTORY_PATH", &trajectory_path);

        if let Some(ref agent) = self.config.agent {
            cmd.env("DEFAULT_AGENT", agent);
        }
        if let Some(max_iterations) = self.config.max_iterations {
            cmd.env("MAX_ITERATIONS", max_iterations.to_string());
        }

        info!(
            "Spawning OpenHands: workspace={}, session_id={}, attempt={}, agent={:?}",
            runtime.workspace_base.display(),
            session_id,
            attempt,
            self.config.agent
        );

        let mut child = cmd.spawn().map_err(|e| {
            error!("Failed to spawn OpenHands: {}", e);
            anyhow!(
                "Failed to spawn OpenHands: {}. Is it installed for '{}'?",
                e,
                self.config.python_path
            )
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to capture OpenHands stdout"))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("Failed to capture OpenHands stderr"))?;

        // Both pipes must be drained or the child blocks on a full buffer.
        let stdout_task = drain_lines(stdout, "stdout");
        let stderr_task = drain_lines(stderr, "stderr");

        let status = child
            .wait()
            .await
            .context("Failed to wait for OpenHands")?;
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        if status.success() {
            debug!("OpenHands exited successfully");
        } else {
            warn!("OpenHands exited with status: {}", status);
        }

        let raw = match tokio::fs::read_to_string(&trajectory_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "OpenHands left no trajectory at {}",
                    trajectory_path.display()
                );
                return Ok(None);
            }
            Err(e) => {
                return Err(anyhow!(
                    "Failed to read trajectory {}: {}",
                    trajectory_path.display(),
                    e
                ))
            }
        };

        if let Err(e) = tokio::fs::remove_file(&trajectory_path).await {
            debug!("Could not remove trajectory file: {}", e);
        }

        let history = parse_trajectory(&raw)?;
        debug!("Parsed {} trajectory events", history.len());

        Ok(Some(TrajectoryRun {
            history,
            exit_success: status.success(),
        }))
    }
}

impl Default for OpenHandsClient {
    fn default() -> Self {
        Self::new()
    }
}

fn drain_lines<R>(reader: R, stream: &'static str) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if !line.is_empty() {
                debug!("OpenHands {}: {}", stream, truncate_for_log(&line, 200));
            }
        }
    })
}

/// Parse a trajectory file (a JSON array of serialized events).
///
/// Entries that do not deserialize are kept as `Other` so the history length
/// still matches the file.
pub fn parse_trajectory(raw: &str) -> Result<Vec<HistoryEvent>> {
    let entries: Vec<Value> =
        serde_json::from_str(raw).context("Trajectory is not a JSON array")?;

    Ok(entries
        .into_iter()
        .map(|value| match serde_json::from_value::<TrajectoryEntry>(value) {
            Ok(entry) => HistoryEvent::from(entry),
            Err(e) => {
                warn!("Failed to parse trajectory entry: {}", e);
                HistoryEvent::Other {
                    kind: "unparsed".to_string(),
                }
            }
        })
        .collect())
}

/// Derive the terminal agent state of one run.
///
/// An explicit state-change observation wins. Otherwise the last meaningful
/// event decides: a finish action means finished, an agent message waiting
/// for a response means the agent is blocked on the user.
pub fn terminal_state(history: &[HistoryEvent], exit_success: bool) -> AgentState {
    if let Some(state) = history.iter().rev().find_map(|event| match event {
        HistoryEvent::AgentStateChanged { agent_state } => Some(*agent_state),
        _ => None,
    }) {
        return state;
    }

    let last = history
        .iter()
        .rev()
        .find(|event| !matches!(event, HistoryEvent::Other { .. }));

    match last {
        Some(HistoryEvent::Finish { .. }) => AgentState::Finished,
        Some(HistoryEvent::Message {
            source,
            wait_for_response: true,
            ..
        }) if source.as_deref() == Some("agent") => AgentState::AwaitingUserInput,
        _ if !exit_success => AgentState::Error,
        Some(HistoryEvent::Error { .. }) => AgentState::Error,
        _ => AgentState::Stopped,
    }
}
