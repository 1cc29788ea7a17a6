//! Chat helpers for the Azure OpenAI deployments used alongside the harvester.
//!
//! Two deployments are supported and selected by name: `gpt-4o` (API key auth)
//! and `o3-mini` (Azure CLI bearer token). Each call makes exactly one
//! non-streaming request.

mod azure;
mod credential;
mod error;

pub use azure::{
    AzureAuth, AzureOpenAIClient, GPT4O_MAX_COMPLETION_TOKENS, O3MINI_MAX_COMPLETION_TOKENS,
};
pub use credential::{AzureCliCredential, TokenProvider};
pub use error::{classify_http_status, ChatError, LlmError, LlmErrorKind};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::config::AzureConfig;

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "o3-mini";

/// Role in a chat conversation.
///
/// `Developer` is the system-role replacement accepted by reasoning models.
/// `Tool` carries tool output in conversations built by the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Developer,
    User,
    Assistant,
    Tool,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// A prompt is either plain text or an already-built conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptInput {
    Text(String),
    Messages(Vec<ChatMessage>),
}

impl From<&str> for PromptInput {
    fn from(text: &str) -> Self {
        PromptInput::Text(text.to_string())
    }
}

impl From<String> for PromptInput {
    fn from(text: String) -> Self {
        PromptInput::Text(text)
    }
}

impl From<Vec<ChatMessage>> for PromptInput {
    fn from(messages: Vec<ChatMessage>) -> Self {
        PromptInput::Messages(messages)
    }
}

/// Build the message list sent to the model.
///
/// Text becomes a single user message, preceded by a system message when
/// `system_prompt` is non-empty. A conversation gets the system message
/// prepended only if it is non-empty and does not already start with one.
pub fn format_prompt(prompt: PromptInput, system_prompt: &str) -> Vec<ChatMessage> {
    match prompt {
        PromptInput::Messages(messages) => {
            let needs_system = !system_prompt.is_empty()
                && messages
                    .first()
                    .is_some_and(|first| first.role != Role::System);
            if needs_system {
                let mut formatted = Vec::with_capacity(messages.len() + 1);
                formatted.push(ChatMessage::system(system_prompt));
                formatted.extend(messages);
                formatted
            } else {
                messages
            }
        }
        PromptInput::Text(text) => {
            let mut formatted = Vec::with_capacity(2);
            if !system_prompt.is_empty() {
                formatted.push(ChatMessage::system(system_prompt));
            }
            formatted.push(ChatMessage::user(text));
            formatted
        }
    }
}

/// Supported chat models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AzureModel {
    Gpt4o,
    O3Mini,
}

impl AzureModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AzureModel::Gpt4o => "gpt-4o",
            AzureModel::O3Mini => "o3-mini",
        }
    }
}

impl FromStr for AzureModel {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gpt-4o" => Ok(AzureModel::Gpt4o),
            "o3-mini" => Ok(AzureModel::O3Mini),
            other => Err(ChatError::UnsupportedModel(other.to_string())),
        }
    }
}

impl fmt::Display for AzureModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployment that can answer a chat conversation.
#[async_trait]
pub trait ChatDeployment: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the deployment's credentials or tools are present.
    fn is_available(&self) -> bool;

    /// Send one request. `Ok(None)` means the model returned no content.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<Option<Vec<String>>, ChatError>;
}

/// Routes a chat call to the deployment named by the caller.
pub struct AzureChat {
    gpt4o: Arc<dyn ChatDeployment>,
    o3mini: Arc<dyn ChatDeployment>,
}

impl AzureChat {
    pub fn new(gpt4o: Arc<dyn ChatDeployment>, o3mini: Arc<dyn ChatDeployment>) -> Self {
        Self { gpt4o, o3mini }
    }

    pub fn from_config(config: &AzureConfig) -> Self {
        Self::new(
            Arc::new(AzureOpenAIClient::gpt4o(&config.gpt4o)),
            Arc::new(AzureOpenAIClient::o3mini(&config.o3mini)),
        )
    }

    fn deployment(&self, model: AzureModel) -> &Arc<dyn ChatDeployment> {
        match model {
            AzureModel::Gpt4o => &self.gpt4o,
            AzureModel::O3Mini => &self.o3mini,
        }
    }

    /// Send `prompt` to `model` and return the trimmed reply, or `None` when
    /// the model produced no content.
    ///
    /// # Errors
    ///
    /// `UnsupportedModel` for names other than `gpt-4o` and `o3-mini`,
    /// `MissingDependency` when the deployment cannot authenticate, and
    /// `Request`/`Credential` when the call itself fails.
    pub async fn call_chat(
        &self,
        prompt: impl Into<PromptInput>,
        system_prompt: &str,
        model: &str,
    ) -> Result<Option<Vec<String>>, ChatError> {
        let model: AzureModel = model.parse()?;
        let deployment = self.deployment(model);
        let target = Arc::clone(deployment);
        let available = tokio::task::spawn_blocking(move || target.is_available())
            .await
            .unwrap_or(false);
        if !available {
            return Err(ChatError::MissingDependency(format!(
                "{} deployment '{}' has no usable credentials",
                model,
                deployment.name()
            )));
        }

        let messages = format_prompt(prompt.into(), system_prompt);
        info!("Calling {} with {} messages", model, messages.len());
        deployment.complete(&messages).await
    }
}

/// Send one chat request using deployments configured from the environment.
pub async fn call_azure_chat(
    prompt: impl Into<PromptInput>,
    system_prompt: &str,
    model: &str,
) -> Result<Option<Vec<String>>, ChatError> {
    AzureChat::from_config(&AzureConfig::from_env())
        .call_chat(prompt, system_prompt, model)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingDeployment {
        name: &'static str,
        available: bool,
        reply: Option<Vec<String>>,
        calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl RecordingDeployment {
        fn new(name: &'static str, available: bool, reply: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                name,
                available,
                reply: reply.map(|r| vec![r.to_string()]),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatDeployment for RecordingDeployment {
        fn name(&self) -> &str {
            self.name
        }

        fn is_available(&self) -> bool {
            self.available
        }

        async fn complete(
            &self,
            messages: &[ChatMessage],
        ) -> Result<Option<Vec<String>>, ChatError> {
            self.calls.lock().unwrap().push(messages.to_vec());
            Ok(self.reply.clone())
        }
    }

    #[test]
    fn test_format_text_prompt() {
        assert_eq!(
            format_prompt("Hello".into(), "Be brief."),
            vec![ChatMessage::system("Be brief."), ChatMessage::user("Hello")]
        );
        assert_eq!(
            format_prompt("Hello".into(), ""),
            vec![ChatMessage::user("Hello")]
        );
    }

    #[test]
    fn test_format_message_list() {
        let with_system = vec![ChatMessage::system("Existing"), ChatMessage::user("Hi")];
        assert_eq!(
            format_prompt(with_system.clone().into(), "New system"),
            with_system
        );

        let without_system = vec![ChatMessage::user("Hi")];
        assert_eq!(
            format_prompt(without_system.into(), "New system"),
            vec![ChatMessage::system("New system"), ChatMessage::user("Hi")]
        );

        assert!(format_prompt(Vec::<ChatMessage>::new().into(), "New system").is_empty());
        assert_eq!(
            format_prompt(vec![ChatMessage::user("Hi")].into(), ""),
            vec![ChatMessage::user("Hi")]
        );
    }

    #[test]
    fn test_model_names() {
        assert_eq!("gpt-4o".parse::<AzureModel>().unwrap(), AzureModel::Gpt4o);
        assert_eq!("o3-mini".parse::<AzureModel>().unwrap(), AzureModel::O3Mini);
        assert!(matches!(
            "GPT-4o".parse::<AzureModel>(),
            Err(ChatError::UnsupportedModel(ref name)) if name == "GPT-4o"
        ));
        assert_eq!(AzureModel::O3Mini.to_string(), DEFAULT_MODEL);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_value(ChatMessage::system("x")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "system", "content": "x"}));
    }

    #[tokio::test]
    async fn test_routes_to_gpt4o_only() {
        let gpt4o = RecordingDeployment::new("gpt-4o", true, Some("from 4o"));
        let o3mini = RecordingDeployment::new("o3-mini", true, Some("from o3"));
        let chat = AzureChat::new(gpt4o.clone(), o3mini.clone());

        let result = chat.call_chat("Hello", "Be brief.", "gpt-4o").await.unwrap();
        assert_eq!(result, Some(vec!["from 4o".to_string()]));
        assert_eq!(
            gpt4o.calls(),
            vec![vec![ChatMessage::system("Be brief."), ChatMessage::user("Hello")]]
        );
        assert!(o3mini.calls().is_empty());
    }

    #[tokio::test]
    async fn test_routes_to_o3mini_only() {
        let gpt4o = RecordingDeployment::new("gpt-4o", true, Some("from 4o"));
        let o3mini = RecordingDeployment::new("o3-mini", true, None);
        let chat = AzureChat::new(gpt4o.clone(), o3mini.clone());

        let result = chat.call_chat("Hello", "", DEFAULT_MODEL).await.unwrap();
        assert_eq!(result, None);
        assert_eq!(o3mini.calls().len(), 1);
        assert!(gpt4o.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_model_makes_no_request() {
        let gpt4o = RecordingDeployment::new("gpt-4o", true, Some("x"));
        let o3mini = RecordingDeployment::new("o3-mini", true, Some("x"));
        let chat = AzureChat::new(gpt4o.clone(), o3mini.clone());

        let err = chat.call_chat("Hello", "", "invalid-model").await.unwrap_err();
        assert!(matches!(err, ChatError::UnsupportedModel(ref name) if name == "invalid-model"));
        assert!(gpt4o.calls().is_empty());
        assert!(o3mini.calls().is_empty());
    }

    #[test]
    fn test_conversation_with_developer_and_tool_roles() {
        let raw = r#"[
            {"role": "developer", "content": "Answer tersely."},
            {"role": "user", "content": "Run the tests"},
            {"role": "assistant", "content": "Running."},
            {"role": "tool", "content": "3 passed"}
        ]"#;
        let messages: Vec<ChatMessage> = serde_json::from_str(raw).unwrap();
        assert_eq!(messages[0].role, Role::Developer);
        assert_eq!(messages[3].role, Role::Tool);

        let formatted = format_prompt(messages.into(), "Be helpful.");
        let roles: Vec<Role> = formatted.iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::Developer,
                Role::User,
                Role::Assistant,
                Role::Tool
            ]
        );

        let body = serde_json::to_value(&formatted).unwrap();
        assert_eq!(body[1]["role"], "developer");
        assert_eq!(body[4]["role"], "tool");
    }

    struct ThreadRecordingDeployment {
        checked_on: Mutex<Option<std::thread::ThreadId>>,
    }

    #[async_trait]
    impl ChatDeployment for ThreadRecordingDeployment {
        fn name(&self) -> &str {
            "o3-mini"
        }

        fn is_available(&self) -> bool {
            *self.checked_on.lock().unwrap() = Some(std::thread::current().id());
            true
        }

        async fn complete(
            &self,
            _messages: &[ChatMessage],
        ) -> Result<Option<Vec<String>>, ChatError> {
            Ok(Some(vec!["ok".to_string()]))
        }
    }

    #[tokio::test]
    async fn test_availability_check_runs_off_the_async_thread() {
        let gpt4o = RecordingDeployment::new("gpt-4o", true, Some("x"));
        let o3mini = Arc::new(ThreadRecordingDeployment {
            checked_on: Mutex::new(None),
        });
        let chat = AzureChat::new(gpt4o, o3mini.clone());

        let result = chat.call_chat("Hello", "", "o3-mini").await.unwrap();
        assert_eq!(result, Some(vec!["ok".to_string()]));
        let checked_on = o3mini.checked_on.lock().unwrap().expect("checked");
        assert_ne!(checked_on, std::thread::current().id());
    }

    #[tokio::test]
    async fn test_unavailable_deployment_is_missing_dependency() {
        let gpt4o = RecordingDeployment::new("gpt-4o", false, Some("x"));
        let o3mini = RecordingDeployment::new("o3-mini", true, Some("x"));
        let chat = AzureChat::new(gpt4o.clone(), o3mini);

        let err = chat.call_chat("Hello", "", "gpt-4o").await.unwrap_err();
        assert!(matches!(err, ChatError::MissingDependency(_)));
        assert!(gpt4o.calls().is_empty());
    }
}
