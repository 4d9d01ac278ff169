//! Conversation pipeline for the Houdini assistant.
//!
//! This module runs one conversational turn at a time and exposes the state
//! the UI renders.
//!
//! # Architecture
//!
//! ```text
//! UI (prompt field)
//!        │ submit(prompt)
//!        ▼
//! ConversationPipeline          ← tokio task per turn
//!        │
//!        ├─ LanguageModelClient::generate   → AwaitingResponse
//!        ├─ ConversationHistory::append     → Speaking
//!        └─ VoiceOutput::speak              → Idle
//!
//! watch::Receiver<PipelineSnapshot> ←─── read by the UI after every change
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use houdini::config::AppConfig;
//! use houdini::llm::{GeminiClient, RetryingClient};
//! use houdini::pipeline::{ConversationPipeline, PipelineOptions};
//! use houdini::voice::VoiceOutput;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let gemini = GeminiClient::from_config(&config.model).expect("model config");
//!     let client = Arc::new(RetryingClient::from_config(gemini, &config.model));
//!     let voice = Arc::new(VoiceOutput::from_config(&config.voice));
//!
//!     let pipeline =
//!         ConversationPipeline::new(client, voice, PipelineOptions::from_config(&config));
//!     let mut snapshots = pipeline.subscribe();
//!
//!     pipeline.submit("Hello").expect("non-empty prompt");
//!     while snapshots.changed().await.is_ok() {
//!         let snapshot = snapshots.borrow_and_update().clone();
//!         println!("{}: {} turns", snapshot.state.label(), snapshot.history.len());
//!     }
//! }
//! ```

pub mod history;
pub mod runner;
pub mod state;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use history::{ConversationHistory, Turn, TurnId};
pub use runner::{ConversationPipeline, PipelineOptions, SubmitError, TurnHandle, TurnOutcome};
pub use state::{PipelineSnapshot, PipelineState};
