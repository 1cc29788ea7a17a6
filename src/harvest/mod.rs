//! Run a coding agent against a repository and collect the test files it
//! produced.
//!
//! Candidates come from two places: test files that appear on disk during the
//! run (a before/after snapshot diff) and test files the agent's history says
//! it edited or wrote. The union is read back from the workspace.

pub mod classify;
pub mod history;
pub mod paths;
pub mod snapshot;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::backend::openhands::OpenHandsRuntime;
use crate::backend::{
    auto_continue_response, AgentRuntime, AgentState, RuntimeConfig, UserMessage,
};
use crate::config::Config;
use crate::util::expand_home;

pub use classify::is_test_file;
pub use history::extract_test_paths;
pub use paths::NormalizedPath;
pub use snapshot::snapshot_test_files;

/// Why an agent run produced no usable result.
#[derive(Debug, Error)]
pub enum AgentExecutionError {
    #[error("Agent returned no state")]
    NoState,

    #[error("Agent did not finish (state: {0})")]
    NotFinished(AgentState),

    #[error("Agent runtime failed: {0}")]
    Runtime(String),
}

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Workspace directory not found: {}", .0.display())]
    WorkspaceNotFound(PathBuf),

    #[error(transparent)]
    AgentExecution(#[from] AgentExecutionError),
}

/// Drives one agent run per call and harvests the resulting test files.
pub struct AgentInvoker {
    runtime: Arc<dyn AgentRuntime>,
}

impl AgentInvoker {
    pub fn new(runtime: Arc<dyn AgentRuntime>) -> Self {
        Self { runtime }
    }

    /// Run the agent on `workspace_dir` with `prompt` and return the test
    /// files it created or modified, keyed by workspace-relative POSIX path.
    ///
    /// The agent runs unattended: no browser, no confirmation prompts, and
    /// any question it asks is answered with an instruction to carry on.
    pub async fn invoke(
        &self,
        workspace_dir: impl AsRef<Path>,
        prompt: &str,
    ) -> Result<BTreeMap<String, String>, HarvestError> {
        let requested = expand_home(workspace_dir.as_ref());
        if !requested.is_dir() {
            return Err(HarvestError::WorkspaceNotFound(requested));
        }
        let workspace = requested
            .canonicalize()
            .map_err(|_| HarvestError::WorkspaceNotFound(requested.clone()))?;

        let before = snapshot_test_files(&workspace);
        debug!("Pre-run snapshot: {} test files", before.len());

        let config = RuntimeConfig::headless(&workspace);
        let session_id = self.runtime.generate_session_id(&config);
        info!(
            "Invoking agent: runtime={}, workspace={}, session_id={}",
            self.runtime.id(),
            workspace.display(),
            session_id
        );

        let state = self
            .runtime
            .run_controller(
                &config,
                UserMessage::new(prompt),
                &session_id,
                auto_continue_response,
            )
            .await
            .map_err(|e| AgentExecutionError::Runtime(format!("{:#}", e)))?
            .ok_or(AgentExecutionError::NoState)?;

        if state.agent_state != AgentState::Finished {
            return Err(AgentExecutionError::NotFinished(state.agent_state).into());
        }

        let after = snapshot_test_files(&workspace);
        let mut candidates: BTreeSet<NormalizedPath> =
            after.difference(&before).cloned().collect();
        let from_disk = candidates.len();
        candidates.extend(history::extract_test_paths_under(&state.history, &workspace));
        info!(
            "Agent finished: {} new test files on disk, {} candidates in total",
            from_disk,
            candidates.len()
        );

        Ok(read_files(&workspace, &candidates))
    }

    /// Blocking form of [`AgentInvoker::invoke`] for callers without a runtime.
    ///
    /// Must not be called from inside an async context.
    pub fn invoke_blocking(
        &self,
        workspace_dir: impl AsRef<Path>,
        prompt: &str,
    ) -> Result<BTreeMap<String, String>, HarvestError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| AgentExecutionError::Runtime(format!("failed to start runtime: {}", e)))?;
        rt.block_on(self.invoke(workspace_dir, prompt))
    }
}

/// Read each candidate from `workspace`, skipping anything that is not a
/// regular file, cannot be read, or resolves outside the workspace. Invalid
/// UTF-8 is decoded lossily.
pub fn read_files(
    workspace: &Path,
    candidates: &BTreeSet<NormalizedPath>,
) -> BTreeMap<String, String> {
    let root = workspace
        .canonicalize()
        .unwrap_or_else(|_| workspace.to_path_buf());
    let mut files = BTreeMap::new();
    for candidate in candidates {
        let full = match root.join(candidate.to_path_buf()).canonicalize() {
            Ok(full) => full,
            Err(e) => {
                debug!("Skipping {}: {}", candidate, e);
                continue;
            }
        };
        if !full.starts_with(&root) {
            debug!("Skipping {}: outside the workspace", candidate);
            continue;
        }
        if !full.is_file() {
            debug!("Skipping {}: not a regular file", candidate);
            continue;
        }
        let bytes = match std::fs::read(&full) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("Skipping {}: {}", candidate, e);
                continue;
            }
        };
        let text = match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                debug!("Decoding {} lossily", candidate);
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };
        files.insert(candidate.as_str().to_string(), text);
    }
    files
}

/// Harvest tests from `repo_dir` with the OpenHands runtime configured from
/// the environment. Blocks until the agent is done.
pub fn call_agent(
    repo_dir: impl AsRef<Path>,
    prompt: &str,
) -> anyhow::Result<BTreeMap<String, String>> {
    let config = Config::from_env()?;
    let invoker = AgentInvoker::new(Arc::new(OpenHandsRuntime::with_config(config.openhands)));
    Ok(invoker.invoke_blocking(repo_dir, prompt)?)
}
