//! Bearer tokens for Azure OpenAI deployments that use Entra ID auth.

use async_trait::async_trait;
use serde::Deserialize;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::error::ChatError;
use crate::config::COGNITIVE_SERVICES_SCOPE;
use crate::util::which_exists;

/// Source of bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Whether the provider can be used at all on this machine.
    fn is_available(&self) -> bool;

    async fn token(&self) -> Result<String, ChatError>;
}

/// Tokens minted by the logged-in Azure CLI (`az account get-access-token`).
#[derive(Debug, Clone)]
pub struct AzureCliCredential {
    cli_path: String,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
}

impl AzureCliCredential {
    pub fn new(cli_path: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            scope: scope.into(),
        }
    }

    /// The `--resource` argument: the scope without its `/.default` suffix.
    pub fn resource(&self) -> &str {
        self.scope
            .strip_suffix("/.default")
            .unwrap_or(&self.scope)
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new("az", COGNITIVE_SERVICES_SCOPE)
    }
}

#[async_trait]
impl TokenProvider for AzureCliCredential {
    fn is_available(&self) -> bool {
        which_exists(&self.cli_path)
    }

    async fn token(&self) -> Result<String, ChatError> {
        debug!("Requesting access token for {}", self.resource());
        let output = Command::new(&self.cli_path)
            .args(["account", "get-access-token", "--output", "json", "--resource"])
            .arg(self.resource())
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                ChatError::Credential(format!("failed to run '{}': {}", self.cli_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ChatError::Credential(format!(
                "'{}' exited with {}: {}",
                self.cli_path,
                output.status,
                stderr.trim()
            )));
        }

        let parsed: AccessTokenResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| ChatError::Credential(format!("unexpected CLI output: {}", e)))?;

        parsed
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| ChatError::Credential("CLI output has no accessToken".to_string()))
    }
}
