//! Azure OpenAI chat completions client.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::credential::{AzureCliCredential, TokenProvider};
use super::error::{ChatError, LlmError};
use super::{ChatDeployment, ChatMessage};
use crate::config::{Gpt4oConfig, O3MiniConfig};

pub const GPT4O_MAX_COMPLETION_TOKENS: u32 = 16_384;
pub const O3MINI_MAX_COMPLETION_TOKENS: u32 = 100_000;

/// How requests to a deployment are authenticated.
#[derive(Clone)]
pub enum AzureAuth {
    /// Static key sent in the `api-key` header.
    ApiKey(String),
    /// `Authorization: Bearer` token fetched per request.
    Bearer(Arc<dyn TokenProvider>),
}

impl std::fmt::Debug for AzureAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AzureAuth::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
            AzureAuth::Bearer(_) => f.write_str("Bearer(<provider>)"),
        }
    }
}

/// One Azure OpenAI chat deployment.
pub struct AzureOpenAIClient {
    client: Client,
    name: String,
    endpoint: String,
    deployment: String,
    api_version: String,
    max_completion_tokens: u32,
    auth: AzureAuth,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_completion_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl AzureOpenAIClient {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
        max_completion_tokens: u32,
        auth: AzureAuth,
    ) -> Self {
        Self {
            client: Client::new(),
            name: name.into(),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: api_version.into(),
            max_completion_tokens,
            auth,
        }
    }

    /// The key-authenticated gpt-4o deployment.
    pub fn gpt4o(config: &Gpt4oConfig) -> Self {
        Self::new(
            "gpt-4o",
            config.base_url.clone(),
            config.model.clone(),
            config.api_version.clone(),
            GPT4O_MAX_COMPLETION_TOKENS,
            AzureAuth::ApiKey(config.api_key.clone().unwrap_or_default()),
        )
    }

    /// The o3-mini deployment, authenticated through the Azure CLI.
    pub fn o3mini(config: &O3MiniConfig) -> Self {
        Self::new(
            "o3-mini",
            config.endpoint.clone(),
            config.deployment.clone(),
            config.api_version.clone(),
            O3MINI_MAX_COMPLETION_TOKENS,
            AzureAuth::Bearer(Arc::new(AzureCliCredential::new(
                config.azure_cli_path.clone(),
                config.scope.clone(),
            ))),
        )
    }

    pub fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }
}

#[async_trait]
impl ChatDeployment for AzureOpenAIClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        match &self.auth {
            AzureAuth::ApiKey(key) => !key.trim().is_empty(),
            AzureAuth::Bearer(provider) => provider.is_available(),
        }
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<Option<Vec<String>>, ChatError> {
        let body = ChatCompletionRequest {
            model: &self.deployment,
            messages,
            max_completion_tokens: self.max_completion_tokens,
            stream: false,
        };

        let mut request = self
            .client
            .post(self.url())
            .header("Content-Type", "application/json");
        request = match &self.auth {
            AzureAuth::ApiKey(key) => request.header("api-key", key),
            AzureAuth::Bearer(provider) => {
                let token = provider.token().await?;
                request.header("Authorization", format!("Bearer {}", token))
            }
        };

        debug!(
            "Sending {} messages to {} ({})",
            messages.len(),
            self.name,
            self.deployment
        );

        let response = match request.json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                if e.is_timeout() {
                    return Err(LlmError::network_error(format!("Request timeout: {}", e)).into());
                } else if e.is_connect() {
                    return Err(LlmError::network_error(format!("Connection failed: {}", e)).into());
                } else {
                    return Err(LlmError::network_error(format!("Request failed: {}", e)).into());
                }
            }
        };

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), &text).into());
        }

        let parsed: ChatCompletionResponse = serde_json::from_str(&text).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, text))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .filter(|content| !content.is_empty());

        Ok(content.map(|content| vec![content.trim().to_string()]))
    }
}
