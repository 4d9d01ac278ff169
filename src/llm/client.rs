//! Core `LanguageModelClient` trait and its error type.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// ModelError
// ---------------------------------------------------------------------------

/// Errors that can occur during a model call.
///
/// The `Display` text is what the conversation shows as the failure message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The request did not complete within the configured timeout.
    #[error("timeout")]
    Timeout,

    /// The backend could not be reached or is overloaded (connection refused,
    /// HTTP 429, HTTP 5xx).
    #[error("model unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the prompt itself (HTTP 400, safety block).
    #[error("prompt rejected: {0}")]
    InvalidPrompt(String),

    /// Any other backend failure, including unparseable responses.
    #[error("model error: {0}")]
    Model(String),
}

impl ModelError {
    /// Whether the same request may succeed if sent again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, ModelError::Unavailable(_))
    }
}

impl From<reqwest::Error> for ModelError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ModelError::Timeout
        } else if e.is_connect() || e.is_request() {
            ModelError::Unavailable(e.to_string())
        } else if e.is_decode() {
            ModelError::Model(format!("malformed response: {e}"))
        } else {
            ModelError::Model(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// LanguageModelClient trait
// ---------------------------------------------------------------------------

/// Async trait for a hosted text-generation model.
///
/// Implementors must be `Send + Sync` so they can be shared across tasks
/// (e.g. wrapped in `Arc<dyn LanguageModelClient>`).  Calls are treated as
/// slow and unreliable; callers bound them with their own timeout.
#[async_trait]
pub trait LanguageModelClient: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}
