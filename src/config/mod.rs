//! Configuration module for the Houdini assistant.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for the model
//! backend, voice output, pipeline and UI, `AppPaths` for the platform config
//! directory, TOML persistence via `AppConfig::load` / `AppConfig::save`, and
//! startup validation that yields [`ConfigError`].

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    parse_hex_color, AppConfig, ConfigError, ModelConfig, PipelineConfig, SubmissionPolicy,
    UiConfig, VoiceConfig,
};
