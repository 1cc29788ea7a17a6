//! # agent-harvest
//!
//! Runs an autonomous coding agent against a repository and collects the test
//! files it created or modified.
//!
//! ## Architecture
//!
//! ```text
//!        ┌──────────────────────────────────┐
//!        │          AgentInvoker            │
//!        │  (snapshot, run, diff, read)     │
//!        └────────────────┬─────────────────┘
//!                         │ AgentRuntime
//!                         ▼
//!                ┌─────────────────┐
//!                │ OpenHandsRuntime│
//!                │ (headless CLI)  │
//!                └─────────────────┘
//! ```
//!
//! ## Harvest Flow
//! 1. Snapshot test files in the workspace
//! 2. Run the agent unattended until it finishes
//! 3. Snapshot again and diff
//! 4. Add test files the agent's history says it touched
//! 5. Read the union back as `path -> contents`
//!
//! ## Modules
//! - `harvest`: path normalization, test classification, snapshots, invoker
//! - `backend`: the agent runtime seam and the OpenHands implementation
//! - `llm`: one-shot chat calls to Azure OpenAI deployments
//! - `config`: environment configuration

pub mod backend;
pub mod config;
pub mod harvest;
pub mod llm;
pub mod util;

pub use config::Config;
pub use harvest::{call_agent, AgentInvoker, HarvestError};
pub use llm::{call_azure_chat, AzureChat, ChatError};
