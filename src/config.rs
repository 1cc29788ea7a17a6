//! Configuration management for the harvester and the Azure chat helpers.
//!
//! Configuration can be set via environment variables:
//! - `LLM_BASE_URL` - Optional. Endpoint of the key-authenticated gpt-4o deployment.
//! - `LLM_API_KEY` - Optional. API key for the gpt-4o deployment. Calls fail without it.
//! - `LLM_API_VERSION` - Optional. API version for both deployments (defaults differ per deployment).
//! - `LLM_MODEL` - Optional. Deployment name of the gpt-4o model.
//! - `ENDPOINT_URL` - Optional. Endpoint of the token-authenticated o3-mini deployment.
//! - `DEPLOYMENT_NAME` - Optional. Deployment name of the o3-mini model. Defaults to `o3-mini`.
//! - `AZURE_CLI_PATH` - Optional. Azure CLI used to mint bearer tokens. Defaults to `az`.
//! - `OPENHANDS_PYTHON` - Optional. Interpreter with OpenHands installed. Defaults to `python`.
//! - `OPENHANDS_AGENT` - Optional. Agent class to run.
//! - `OPENHANDS_MAX_ITERATIONS` - Optional. Iteration cap passed to OpenHands.
//! - `OPENHANDS_MAX_CONTINUATIONS` - Optional. How many times a run waiting for input is resumed. Defaults to `2`.
//! - `OPENHANDS_TRAJECTORY_DIR` - Optional. Where trajectories are written. Defaults to the system temp dir.

use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_GPT4O_BASE_URL: &str = "https://deeppromptaustraliaeast.openai.azure.com";
pub const DEFAULT_GPT4O_API_VERSION: &str = "2024-08-01-preview";
pub const DEFAULT_GPT4O_MODEL: &str = "deepprompt-gpt-4o-2024-05-13-global";
pub const DEFAULT_O3MINI_ENDPOINT: &str = "https://aims-oai-research-inference-uks.openai.azure.com/";
pub const DEFAULT_O3MINI_API_VERSION: &str = "2025-01-01-preview";
pub const DEFAULT_O3MINI_DEPLOYMENT: &str = "o3-mini";

/// Token scope for Azure Cognitive Services.
pub const COGNITIVE_SERVICES_SCOPE: &str = "https://cognitiveservices.azure.com/.default";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// The gpt-4o deployment, authenticated with a static API key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gpt4oConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub api_version: String,
    pub model: String,
}

impl Default for Gpt4oConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GPT4O_BASE_URL.to_string(),
            api_key: None,
            api_version: DEFAULT_GPT4O_API_VERSION.to_string(),
            model: DEFAULT_GPT4O_MODEL.to_string(),
        }
    }
}

/// The o3-mini deployment, authenticated with an Azure CLI bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct O3MiniConfig {
    pub endpoint: String,
    pub api_version: String,
    pub deployment: String,
    pub azure_cli_path: String,
    pub scope: String,
}

impl Default for O3MiniConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_O3MINI_ENDPOINT.to_string(),
            api_version: DEFAULT_O3MINI_API_VERSION.to_string(),
            deployment: DEFAULT_O3MINI_DEPLOYMENT.to_string(),
            azure_cli_path: "az".to_string(),
            scope: COGNITIVE_SERVICES_SCOPE.to_string(),
        }
    }
}

/// Both Azure chat deployments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AzureConfig {
    pub gpt4o: Gpt4oConfig,
    pub o3mini: O3MiniConfig,
}

impl AzureConfig {
    /// Load the Azure configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let api_version = lookup("LLM_API_VERSION");

        let gpt4o = Gpt4oConfig {
            base_url: lookup("LLM_BASE_URL").unwrap_or_else(|| DEFAULT_GPT4O_BASE_URL.to_string()),
            api_key: lookup("LLM_API_KEY"),
            api_version: api_version
                .clone()
                .unwrap_or_else(|| DEFAULT_GPT4O_API_VERSION.to_string()),
            model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_GPT4O_MODEL.to_string()),
        };

        let o3mini = O3MiniConfig {
            endpoint: lookup("ENDPOINT_URL").unwrap_or_else(|| DEFAULT_O3MINI_ENDPOINT.to_string()),
            api_version: api_version.unwrap_or_else(|| DEFAULT_O3MINI_API_VERSION.to_string()),
            deployment: lookup("DEPLOYMENT_NAME")
                .unwrap_or_else(|| DEFAULT_O3MINI_DEPLOYMENT.to_string()),
            azure_cli_path: lookup("AZURE_CLI_PATH").unwrap_or_else(|| "az".to_string()),
            scope: COGNITIVE_SERVICES_SCOPE.to_string(),
        };

        Self { gpt4o, o3mini }
    }
}

/// How the OpenHands headless entry point is launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenHandsConfig {
    /// Python interpreter with the `openhands` package importable.
    pub python_path: String,
    /// Agent class (`DEFAULT_AGENT`), if not the OpenHands default.
    pub agent: Option<String>,
    /// Iteration cap (`MAX_ITERATIONS`), if not the OpenHands default.
    pub max_iterations: Option<u32>,
    /// How many times a run that stopped waiting for input is resumed.
    pub max_continuations: u32,
    /// Directory that receives trajectory files.
    pub trajectory_dir: PathBuf,
}

impl Default for OpenHandsConfig {
    fn default() -> Self {
        Self {
            python_path: "python".to_string(),
            agent: None,
            max_iterations: None,
            max_continuations: 2,
            trajectory_dir: std::env::temp_dir(),
        }
    }
}

impl OpenHandsConfig {
    /// Build the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            python_path: lookup("OPENHANDS_PYTHON").unwrap_or(defaults.python_path),
            agent: lookup("OPENHANDS_AGENT").filter(|s| !s.trim().is_empty()),
            max_iterations: parse_optional(&lookup, "OPENHANDS_MAX_ITERATIONS")?,
            max_continuations: parse_optional(&lookup, "OPENHANDS_MAX_CONTINUATIONS")?
                .unwrap_or(defaults.max_continuations),
            trajectory_dir: lookup("OPENHANDS_TRAJECTORY_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.trajectory_dir),
        })
    }
}

fn parse_optional<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue(key.to_string(), format!("{}", e))),
        None => Ok(None),
    }
}

/// Complete configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub openhands: OpenHandsConfig,
    pub azure: AzureConfig,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a numeric variable does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            openhands: OpenHandsConfig::from_lookup(&lookup)?,
            azure: AzureConfig::from_lookup(&lookup),
        })
    }
}
