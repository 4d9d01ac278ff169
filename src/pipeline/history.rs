//! Conversation history — the ordered log of completed turns.
//!
//! [`ConversationHistory`] is append-only.  Insertion order is display order
//! and no de-duplication happens: asking the same question twice yields two
//! turns.  An optional capacity drops the oldest turns first.

use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// Identifier of a [`Turn`], unique within one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(pub u64);

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One successful prompt/response exchange.  Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    id: TurnId,
    prompt: String,
    response: String,
    created_order: u64,
}

impl Turn {
    /// Build a turn; `created_order` doubles as its id.
    pub fn new(prompt: impl Into<String>, response: impl Into<String>, created_order: u64) -> Self {
        Self {
            id: TurnId(created_order),
            prompt: prompt.into(),
            response: response.into(),
            created_order,
        }
    }

    pub fn id(&self) -> TurnId {
        self.id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn response(&self) -> &str {
        &self.response
    }

    /// Monotonic sequence number, starting at 1.
    pub fn created_order(&self) -> u64 {
        self.created_order
    }
}

// ---------------------------------------------------------------------------
// ConversationHistory
// ---------------------------------------------------------------------------

/// Append-only, order-preserving list of turns with a UI selection.
#[derive(Debug, Clone, Default)]
pub struct ConversationHistory {
    turns: VecDeque<Turn>,
    capacity: Option<usize>,
    selected: Option<TurnId>,
}

impl ConversationHistory {
    /// Unbounded history.
    pub fn new() -> Self {
        Self::default()
    }

    /// History holding at most `capacity` turns.  `None` is unbounded.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            turns: VecDeque::new(),
            capacity,
            selected: None,
        }
    }

    /// Append `turn` at the end, evicting the oldest turn when full.
    pub fn append(&mut self, turn: Turn) {
        self.turns.push_back(turn);

        if let Some(cap) = self.capacity {
            while self.turns.len() > cap {
                if let Some(evicted) = self.turns.pop_front() {
                    if self.selected == Some(evicted.id) {
                        self.selected = None;
                    }
                }
            }
        }
    }

    /// All turns, oldest first.
    pub fn all(&self) -> Vec<Turn> {
        self.turns.iter().cloned().collect()
    }

    /// Borrowing iterator over the turns, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Turn> {
        self.turns.iter()
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|t| t.id == id)
    }

    /// Mark `id` as selected and return it.  Unknown ids leave the current
    /// selection unchanged.
    pub fn select(&mut self, id: TurnId) -> Option<&Turn> {
        let found = self.turns.iter().any(|t| t.id == id);
        if found {
            self.selected = Some(id);
        }
        self.get(id)
    }

    pub fn selected(&self) -> Option<&Turn> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn selected_id(&self) -> Option<TurnId> {
        self.selected
    }

    pub fn last(&self) -> Option<&Turn> {
        self.turns.back()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
