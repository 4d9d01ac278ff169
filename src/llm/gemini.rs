//! `GeminiClient` — Google Generative Language `generateContent` backend.
//!
//! All connection details (`base_url`, `api_key`, `model_name`, timeout) come
//! from [`ModelConfig`]; the API key is validated when the client is built so
//! a broken configuration fails at startup rather than on the first turn.

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::config::{ConfigError, ModelConfig};
use crate::llm::client::{LanguageModelClient, ModelError};

/// Reply used when the model answers without any text.
pub const NO_RESPONSE_TEXT: &str = "No response found";

/// Calls `POST {base_url}/v1beta/models/{model}:generateContent`.
pub struct GeminiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    temperature: Option<f32>,
}

impl GeminiClient {
    /// Build a client from the model section of the settings.
    ///
    /// Fails with [`ConfigError`] when the API key is missing or a
    /// placeholder, or when any other model setting is invalid.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let api_key = config.resolve_api_key()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        let endpoint = format!(
            "{}/v1beta/models/{}:generateContent",
            config.base_url.trim_end_matches('/'),
            config.model_name.trim()
        );

        log::debug!("gemini: endpoint {endpoint}");

        Ok(Self {
            client,
            endpoint,
            api_key,
            temperature: config.temperature,
        })
    }

    /// The full `generateContent` URL this client posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request_body(&self, prompt: &str) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [
                { "role": "user", "parts": [ { "text": prompt } ] }
            ]
        });
        if let Some(temperature) = self.temperature {
            body["generationConfig"] = serde_json::json!({ "temperature": temperature });
        }
        body
    }
}

#[async_trait]
impl LanguageModelClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(error_for_status(status, &body));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ModelError::Model(format!("malformed response: {e}")))?;

        extract_text(&json)
    }
}

// ---------------------------------------------------------------------------
// Response handling
// ---------------------------------------------------------------------------

/// Map a non-success HTTP status to a [`ModelError`].
///
/// The API reports failures as `{"error": {"message": "..."}}`; the message
/// is used when present, otherwise the raw body.
fn error_for_status(status: StatusCode, body: &str) -> ModelError {
    let message = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string());
    let message = if message.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {message}")
    };

    match status {
        StatusCode::BAD_REQUEST => ModelError::InvalidPrompt(message),
        StatusCode::TOO_MANY_REQUESTS => ModelError::Unavailable(message),
        s if s.is_server_error() => ModelError::Unavailable(message),
        _ => ModelError::Model(message),
    }
}

/// Pull the generated text out of a `generateContent` response.
///
/// Text parts of the first candidate are concatenated.  A blocked prompt is
/// an [`ModelError::InvalidPrompt`]; a response without text yields
/// [`NO_RESPONSE_TEXT`].
fn extract_text(json: &serde_json::Value) -> Result<String, ModelError> {
    if !json.is_object() {
        return Err(ModelError::Model("malformed response: not a JSON object".into()));
    }

    if let Some(reason) = json["promptFeedback"]["blockReason"].as_str() {
        return Err(ModelError::InvalidPrompt(format!("blocked ({reason})")));
    }

    let text: String = json["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|part| part["text"].as_str())
                .collect()
        })
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        log::warn!("gemini: response contained no text");
        return Ok(NO_RESPONSE_TEXT.to_string());
    }

    Ok(text.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
