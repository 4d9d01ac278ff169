//! Pipeline state machine and the snapshot published to the UI.
//!
//! [`PipelineState`] drives the conversation pipeline.  The UI never touches
//! it directly: it reads [`PipelineSnapshot`]s through a `watch` channel
//! returned by `ConversationPipeline::subscribe`.

use crate::pipeline::history::{Turn, TurnId};

// ---------------------------------------------------------------------------
// PipelineState
// ---------------------------------------------------------------------------

/// States of the conversation pipeline.
///
/// ```text
/// Idle ──submit──▶ AwaitingResponse
///                    ──model ok──▶ Speaking ──speech done / stopped──▶ Idle
///                    ──model err─▶ Failed(message)
///                    ──cancel────▶ Idle
/// Failed ──reset──▶ Idle
/// Failed ──submit─▶ AwaitingResponse
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PipelineState {
    /// Waiting for the user to send a prompt.
    #[default]
    Idle,

    /// A prompt has been sent; the model has not answered yet.
    AwaitingResponse,

    /// The response was added to history and is being spoken.
    Speaking,

    /// The last model call failed with this message.
    Failed(String),
}

impl PipelineState {
    /// Returns `true` while a model call is pending.
    ///
    /// ```
    /// use houdini::pipeline::PipelineState;
    ///
    /// assert!(PipelineState::AwaitingResponse.is_awaiting());
    /// assert!(!PipelineState::Speaking.is_awaiting());
    /// assert!(!PipelineState::Idle.is_awaiting());
    /// ```
    pub fn is_awaiting(&self) -> bool {
        matches!(self, PipelineState::AwaitingResponse)
    }

    /// The failure message, when in `Failed`.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            PipelineState::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// A short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::AwaitingResponse => "Thinking",
            PipelineState::Speaking => "Speaking",
            PipelineState::Failed(_) => "Error",
        }
    }
}

// ---------------------------------------------------------------------------
// PipelineSnapshot
// ---------------------------------------------------------------------------

/// Read-only view of the conversation, published after every change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineSnapshot {
    /// Current phase.
    pub state: PipelineState,
    /// All turns, oldest first.
    pub history: Vec<Turn>,
    /// Turn highlighted in the UI, if any.
    pub selected: Option<TurnId>,
    /// Text of the input field.  Cleared when a turn succeeds, kept when it
    /// fails so the user can retry.
    pub draft: String,
}

impl PipelineSnapshot {
    pub fn selected_turn(&self) -> Option<&Turn> {
        let id = self.selected?;
        self.history.iter().find(|t| t.id() == id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
