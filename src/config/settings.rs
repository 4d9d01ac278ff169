//! Application settings structs, defaults, validation and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across tasks.
//! Missing fields in a settings file fall back to their defaults.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::AppPaths;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Invalid or missing configuration.  Fatal at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// No API key in `settings.toml` or the environment.
    #[error("missing model API key: set `model.api_key` in settings.toml or the {0} environment variable")]
    MissingApiKey(&'static str),

    /// The API key is still the setup placeholder.
    #[error("model API key looks like a placeholder; get a real key at https://ai.google.dev/tutorials/setup")]
    PlaceholderApiKey,

    /// The model name is empty or contains characters that cannot appear in
    /// the request path.
    #[error("invalid model name: {0:?}")]
    InvalidModelName(String),

    /// The base URL is not an http(s) URL.
    #[error("invalid model base URL: {0:?}")]
    InvalidBaseUrl(String),

    /// The request timeout must be at least one second.
    #[error("model timeout must be greater than zero")]
    InvalidTimeout,

    /// A speech parameter is outside its recognised range.
    #[error("voice {name} = {value} is out of range ({min} – {max})")]
    VoiceParameterOutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    /// `history_capacity = 0` would drop every turn.
    #[error("history capacity must be greater than zero when set")]
    InvalidHistoryCapacity,

    /// A colour is not a 6-digit hex string.
    #[error("invalid hex colour: {0:?}")]
    InvalidColor(String),

    /// The HTTP client could not be constructed.
    #[error("cannot build HTTP client: {0}")]
    HttpClient(String),
}

// ---------------------------------------------------------------------------
// ModelConfig
// ---------------------------------------------------------------------------

/// Settings for the hosted language model backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// API key.  The `GEMINI_API_KEY` environment variable takes precedence
    /// when it is set to a non-empty value.
    pub api_key: Option<String>,
    /// Model identifier placed in the request path (e.g. `"gemini-pro"`).
    pub model_name: String,
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// Sampling temperature.  `None` leaves the server default.
    pub temperature: Option<f32>,
    /// Maximum seconds to wait for a response before timing out.
    pub timeout_secs: u64,
    /// Additional attempts after an `Unavailable` error.  `0` disables retry.
    pub max_retries: u32,
    /// Backoff before the first retry; doubles on every further attempt.
    pub retry_backoff_ms: u64,
}

impl ModelConfig {
    /// Environment variable consulted for the API key.
    pub const API_KEY_ENV: &'static str = "GEMINI_API_KEY";

    /// Resolve the API key from the environment or the settings file.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        self.resolve_api_key_from(std::env::var(Self::API_KEY_ENV).ok())
    }

    pub(crate) fn resolve_api_key_from(
        &self,
        env_value: Option<String>,
    ) -> Result<String, ConfigError> {
        let key = env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_key.clone())
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::MissingApiKey(Self::API_KEY_ENV))?;

        if key.starts_with('-') {
            return Err(ConfigError::PlaceholderApiKey);
        }
        Ok(key)
    }

    /// Request timeout as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check everything except the API key (which may come from the
    /// environment at client construction time).
    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.model_name.trim();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'))
        {
            return Err(ConfigError::InvalidModelName(self.model_name.clone()));
        }

        if !(self.base_url.starts_with("https://") || self.base_url.starts_with("http://")) {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidTimeout);
        }

        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model_name: "gemini-pro".into(),
            base_url: "https://generativelanguage.googleapis.com".into(),
            temperature: None,
            timeout_secs: 30,
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// VoiceConfig
// ---------------------------------------------------------------------------

/// Text-to-speech settings.
///
/// `pitch` is a multiplier (0.5 – 2.0, 1.0 = natural voice) and `rate` a
/// normalised speed (0.0 – 1.0, 0.5 = normal speaking rate).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Speak responses at all.
    pub enabled: bool,
    /// Pitch multiplier.
    pub pitch: f32,
    /// Speaking rate.
    pub rate: f32,
    /// Voice override per ISO-639-1 language code (e.g. `"en" = "en-us"`).
    /// Languages without an entry use their language code as the voice.
    pub voice_for_language: BTreeMap<String, String>,
    /// Name or path of the `espeak-ng` executable.
    pub espeak_binary: String,
}

impl VoiceConfig {
    pub const PITCH_RANGE: (f32, f32) = (0.5, 2.0);
    pub const RATE_RANGE: (f32, f32) = (0.0, 1.0);

    /// Voice name for a language code.
    pub fn voice_for(&self, language_code: &str) -> String {
        self.voice_for_language
            .get(language_code)
            .cloned()
            .unwrap_or_else(|| language_code.to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("pitch", self.pitch, Self::PITCH_RANGE)?;
        check_range("rate", self.rate, Self::RATE_RANGE)?;
        Ok(())
    }
}

fn check_range(name: &'static str, value: f32, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if value.is_nan() || value < min || value > max {
        return Err(ConfigError::VoiceParameterOutOfRange {
            name,
            value,
            min,
            max,
        });
    }
    Ok(())
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pitch: 1.6,
            rate: 0.5,
            voice_for_language: BTreeMap::new(),
            espeak_binary: "espeak-ng".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// What happens to a submission that arrives while a model call is pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionPolicy {
    /// Refuse it with `SubmitError::Busy`.
    Reject,
    /// Hold it in a single slot and run it after the current turn.
    Queue,
}

impl Default for SubmissionPolicy {
    fn default() -> Self {
        Self::Queue
    }
}

/// Conversation pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Behaviour for overlapping submissions.
    pub submission_policy: SubmissionPolicy,
    /// Keep at most this many turns (oldest dropped first).  `None` keeps
    /// every turn for the whole session.
    pub history_capacity: Option<usize>,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == Some(0) {
            return Err(ConfigError::InvalidHistoryCapacity);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// Styling handed to whatever renders the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Accent colour as 6 hex digits, optional leading `#`.
    pub accent_color: String,
}

impl UiConfig {
    /// The accent colour as `(r, g, b)`.
    pub fn accent_rgb(&self) -> Result<(u8, u8, u8), ConfigError> {
        parse_hex_color(&self.accent_color)
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            accent_color: "EB1D36".into(),
        }
    }
}

/// Parse `"EB1D36"` / `"#eb1d36"` into an RGB triple.
pub fn parse_hex_color(hex: &str) -> Result<(u8, u8, u8), ConfigError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ConfigError::InvalidColor(hex.to_string()));
    }
    let value =
        u32::from_str_radix(digits, 16).map_err(|_| ConfigError::InvalidColor(hex.to_string()))?;
    Ok((
        ((value >> 16) & 0xFF) as u8,
        ((value >> 8) & 0xFF) as u8,
        (value & 0xFF) as u8,
    ))
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use houdini::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// config.validate().expect("invalid settings");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Language model backend settings.
    pub model: ModelConfig,
    /// Text-to-speech settings.
    pub voice: VoiceConfig,
    /// Conversation pipeline settings.
    pub pipeline: PipelineConfig,
    /// Styling.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate every section.  The API key is checked separately when the
    /// model client is built.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.voice.validate()?;
        self.pipeline.validate()?;
        self.ui.accent_rgb()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.model.api_key = Some("AIza-test".into());
        cfg.model.model_name = "gemini-1.5-flash".into();
        cfg.model.timeout_secs = 5;
        cfg.model.temperature = Some(0.4);
        cfg.voice.pitch = 1.0;
        cfg.voice
            .voice_for_language
            .insert("en".into(), "en-us".into());
        cfg.pipeline.submission_policy = SubmissionPolicy::Reject;
        cfg.pipeline.history_capacity = Some(50);
        cfg.ui.accent_color = "#112233".into();

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.model.api_key.as_deref(), Some("AIza-test"));
        assert_eq!(loaded.model.model_name, "gemini-1.5-flash");
        assert_eq!(loaded.model.timeout_secs, 5);
        assert_eq!(loaded.model.temperature, Some(0.4));
        assert_eq!(loaded.voice.pitch, 1.0);
        assert_eq!(loaded.voice.voice_for("en"), "en-us");
        assert_eq!(loaded.pipeline.submission_policy, SubmissionPolicy::Reject);
        assert_eq!(loaded.pipeline.history_capacity, Some(50));
        assert_eq!(loaded.ui.accent_rgb(), Ok((0x11, 0x22, 0x33)));
    }

    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config.model.model_name, "gemini-pro");
        assert!(config.model.api_key.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[model]\napi_key = \"abc\"\n").unwrap();

        let config = AppConfig::load_from(&path).expect("load");
        assert_eq!(config.model.api_key.as_deref(), Some("abc"));
        assert_eq!(config.model.timeout_secs, 30);
        assert_eq!(config.voice.rate, 0.5);
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.model.model_name, "gemini-pro");
        assert_eq!(cfg.model.max_retries, 0);
        assert_eq!(cfg.voice.pitch, 1.6);
        assert_eq!(cfg.voice.rate, 0.5);
        assert!(cfg.voice.enabled);
        assert_eq!(cfg.pipeline.submission_policy, SubmissionPolicy::Queue);
        assert_eq!(cfg.pipeline.history_capacity, None);
        assert_eq!(cfg.ui.accent_rgb(), Ok((0xEB, 0x1D, 0x36)));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn api_key_resolution() {
        let mut model = ModelConfig::default();
        assert_eq!(
            model.resolve_api_key_from(None),
            Err(ConfigError::MissingApiKey(ModelConfig::API_KEY_ENV))
        );

        model.api_key = Some("   ".into());
        assert!(matches!(
            model.resolve_api_key_from(None),
            Err(ConfigError::MissingApiKey(_))
        ));

        model.api_key = Some("-replace-me".into());
        assert_eq!(
            model.resolve_api_key_from(None),
            Err(ConfigError::PlaceholderApiKey)
        );

        model.api_key = Some("from-file".into());
        assert_eq!(model.resolve_api_key_from(None).unwrap(), "from-file");
        assert_eq!(
            model.resolve_api_key_from(Some("from-env".into())).unwrap(),
            "from-env"
        );
        // Blank environment value does not shadow the file.
        assert_eq!(
            model.resolve_api_key_from(Some(String::new())).unwrap(),
            "from-file"
        );
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut cfg = AppConfig::default();
        cfg.model.model_name = "gemini pro/../x".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidModelName(_))));

        let mut cfg = AppConfig::default();
        cfg.model.base_url = "ftp://example.com".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidBaseUrl(_))));

        let mut cfg = AppConfig::default();
        cfg.model.timeout_secs = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidTimeout));

        let mut cfg = AppConfig::default();
        cfg.voice.pitch = 3.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::VoiceParameterOutOfRange { name: "pitch", .. })
        ));

        let mut cfg = AppConfig::default();
        cfg.voice.rate = f32::NAN;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::VoiceParameterOutOfRange { name: "rate", .. })
        ));

        let mut cfg = AppConfig::default();
        cfg.pipeline.history_capacity = Some(0);
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidHistoryCapacity));

        let mut cfg = AppConfig::default();
        cfg.ui.accent_color = "red".into();
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidColor(_))));
    }

    #[test]
    fn hex_colour_parsing() {
        assert_eq!(parse_hex_color("EB1D36"), Ok((235, 29, 54)));
        assert_eq!(parse_hex_color("#000000"), Ok((0, 0, 0)));
        assert!(parse_hex_color("#12345").is_err());
        assert!(parse_hex_color("GGGGGG").is_err());
    }
}
