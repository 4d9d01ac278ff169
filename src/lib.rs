//! Houdini — a conversational assistant that answers prompts with a
//! language model and reads the answers aloud.
//!
//! * [`config`] — settings file, API key resolution, validation.
//! * [`llm`] — language model clients (Gemini, retry wrapper).
//! * [`voice`] — language detection and speech output.
//! * [`pipeline`] — the turn state machine and conversation history.

pub mod config;
pub mod llm;
pub mod pipeline;
pub mod voice;
