//! Language model backend for the Houdini assistant.
//!
//! This module provides:
//! * [`LanguageModelClient`] — async trait implemented by all model backends.
//! * [`GeminiClient`] — Google Generative Language REST backend.
//! * [`RetryingClient`] — wraps any client; retries `Unavailable` errors with
//!   exponential backoff.
//! * [`ModelError`] — error variants for model calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use houdini::config::AppConfig;
//! use houdini::llm::{GeminiClient, LanguageModelClient, RetryingClient};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!
//!     // Fails fast when no API key is configured.
//!     let gemini = GeminiClient::from_config(&config.model).expect("model config");
//!     let client = RetryingClient::from_config(gemini, &config.model);
//!
//!     let text = client.generate("Explain gravity").await.unwrap();
//!     println!("{text}");
//! }
//! ```

pub mod client;
pub mod gemini;
pub mod retry;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use client::{LanguageModelClient, ModelError};
pub use gemini::GeminiClient;
pub use retry::RetryingClient;
