//! Error types for the Azure chat helpers.

use thiserror::Error;

/// Why a chat call failed.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Chat request failed: {0}")]
    Request(#[from] LlmError),

    #[error("Failed to acquire Azure credential: {0}")]
    Credential(String),
}

/// Error from a chat completion HTTP call.
#[derive(Debug)]
pub struct LlmError {
    pub kind: LlmErrorKind,
    /// HTTP status code, if the server answered.
    pub status_code: Option<u16>,
    pub message: String,
}

impl LlmError {
    /// Build an error from a non-success HTTP status and its body.
    pub fn from_status(status_code: u16, body: &str) -> Self {
        Self {
            kind: classify_http_status(status_code),
            status_code: Some(status_code),
            message: body.to_string(),
        }
    }

    pub fn network_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::NetworkError,
            status_code: None,
            message,
        }
    }

    pub fn parse_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::ParseError,
            status_code: None,
            message,
        }
    }

    /// Whether the same request might succeed later.
    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Classification of chat request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// 429
    RateLimited,
    /// 5xx
    ServerError,
    /// 4xx other than 429
    ClientError,
    /// Connection failed or timed out
    NetworkError,
    /// Response body did not match the expected shape
    ParseError,
}

impl LlmErrorKind {
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmErrorKind::RateLimited | LlmErrorKind::ServerError | LlmErrorKind::NetworkError
        )
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmErrorKind::RateLimited => write!(f, "Rate limited"),
            LlmErrorKind::ServerError => write!(f, "Server error"),
            LlmErrorKind::ClientError => write!(f, "Client error"),
            LlmErrorKind::NetworkError => write!(f, "Network error"),
            LlmErrorKind::ParseError => write!(f, "Parse error"),
        }
    }
}

/// Parse HTTP status code into error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}
