//! Conversation pipeline — drives one prompt → model → history → speech turn.
//!
//! [`ConversationPipeline`] owns the [`PipelineState`] and the
//! [`ConversationHistory`].  The UI calls [`submit`](ConversationPipeline::submit)
//! and re-renders from the [`PipelineSnapshot`]s published on a
//! `tokio::sync::watch` channel; it never blocks on a turn.
//!
//! # Turn flow
//!
//! ```text
//! submit(prompt)
//!   ├─ blank prompt            → Err(InvalidInput), nothing changes
//!   ├─ AwaitingResponse        → Err(Busy) | queued (single slot)
//!   ├─ Speaking                → stop speech, start queued or new turn
//!   │                            (a new prompt behind a queued one waits)
//!   └─ Idle / Failed           → AwaitingResponse, tokio::spawn(turn)
//!
//! turn
//!   └─ timeout(generate(prompt))
//!         ├─ Ok  → append Turn, Speaking, clear draft, speak → Idle
//!         └─ Err → Failed(message), draft kept, queued prompt dropped
//! ```
//!
//! Every spawned turn carries the generation number current at submission.
//! `cancel()` and superseding submissions bump the generation, so a result
//! that arrives late is dropped instead of touching state or history.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::{AppConfig, SubmissionPolicy};
use crate::llm::{LanguageModelClient, ModelError};
use crate::voice::VoiceOutput;

use super::history::{ConversationHistory, Turn, TurnId};
use super::state::{PipelineSnapshot, PipelineState};

// ---------------------------------------------------------------------------
// SubmitError
// ---------------------------------------------------------------------------

/// Reasons a submission is refused before any model call is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// The prompt is empty or whitespace only.
    #[error("type a message first")]
    InvalidInput,

    /// A response is still pending and the policy does not accept another
    /// prompt (or the queue slot is taken).
    #[error("still waiting for the previous response")]
    Busy,
}

// ---------------------------------------------------------------------------
// TurnOutcome / TurnHandle
// ---------------------------------------------------------------------------

/// How a submitted turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The response was added to history (and speech has finished).
    Completed(Turn),
    /// The model call failed; history is unchanged.
    Failed(ModelError),
    /// The turn was cancelled or superseded before its result was used.
    Cancelled,
}

/// Handle to a submitted turn.  Dropping it does not cancel the turn.
#[derive(Debug)]
pub struct TurnHandle {
    rx: oneshot::Receiver<TurnOutcome>,
    queued: bool,
}

impl TurnHandle {
    /// `true` when the prompt is waiting in the queue slot.
    pub fn is_queued(&self) -> bool {
        self.queued
    }

    /// Wait for the turn to end.
    pub async fn outcome(self) -> TurnOutcome {
        self.rx.await.unwrap_or(TurnOutcome::Cancelled)
    }
}

// ---------------------------------------------------------------------------
// PipelineOptions
// ---------------------------------------------------------------------------

/// Runtime knobs for [`ConversationPipeline`].
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Upper bound on one model call.
    pub timeout: Duration,
    /// Overlapping-submission behaviour.
    pub policy: SubmissionPolicy,
    /// Optional history bound.
    pub history_capacity: Option<usize>,
}

impl PipelineOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            timeout: config.model.timeout(),
            policy: config.pipeline.submission_policy,
            history_capacity: config.pipeline.history_capacity,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct Pending {
    prompt: String,
    reply: oneshot::Sender<TurnOutcome>,
}

struct Core {
    state: PipelineState,
    history: ConversationHistory,
    draft: String,
    /// `created_order` of the last appended turn.
    last_order: u64,
    generation: u64,
    task: Option<JoinHandle<()>>,
    queued: Option<Pending>,
}

impl Core {
    fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            state: self.state.clone(),
            history: self.history.all(),
            selected: self.history.selected_id(),
            draft: self.draft.clone(),
        }
    }
}

struct Inner {
    client: Arc<dyn LanguageModelClient>,
    voice: Arc<VoiceOutput>,
    options: PipelineOptions,
    core: Mutex<Core>,
    snapshots: watch::Sender<PipelineSnapshot>,
}

// ---------------------------------------------------------------------------
// ConversationPipeline
// ---------------------------------------------------------------------------

/// Orchestrates conversational turns.  Cheap to clone; clones share state.
///
/// `submit` spawns onto the current tokio runtime and must be called from
/// within one.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use houdini::config::AppConfig;
/// use houdini::llm::GeminiClient;
/// use houdini::pipeline::{ConversationPipeline, PipelineOptions, TurnOutcome};
/// use houdini::voice::VoiceOutput;
///
/// # async fn example() {
/// let config = AppConfig::load().unwrap();
/// let client = Arc::new(GeminiClient::from_config(&config.model).unwrap());
/// let voice = Arc::new(VoiceOutput::from_config(&config.voice));
/// let pipeline = ConversationPipeline::new(client, voice, PipelineOptions::from_config(&config));
///
/// let handle = pipeline.submit("Explain gravity").unwrap();
/// if let TurnOutcome::Completed(turn) = handle.outcome().await {
///     println!("{}", turn.response());
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct ConversationPipeline {
    inner: Arc<Inner>,
}

impl ConversationPipeline {
    pub fn new(
        client: Arc<dyn LanguageModelClient>,
        voice: Arc<VoiceOutput>,
        options: PipelineOptions,
    ) -> Self {
        let core = Core {
            state: PipelineState::Idle,
            history: ConversationHistory::with_capacity(options.history_capacity),
            draft: String::new(),
            last_order: 0,
            generation: 0,
            task: None,
            queued: None,
        };
        let (snapshots, _) = watch::channel(core.snapshot());

        Self {
            inner: Arc::new(Inner {
                client,
                voice,
                options,
                core: Mutex::new(core),
                snapshots,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Submit a prompt.  Returns immediately; the turn runs in the background.
    pub fn submit(&self, prompt: impl Into<String>) -> Result<TurnHandle, SubmitError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            log::debug!("pipeline: rejected blank prompt");
            return Err(SubmitError::InvalidInput);
        }

        let (reply, rx) = oneshot::channel();
        let mut core = self.inner.lock_core();

        match core.state.clone() {
            PipelineState::AwaitingResponse => match self.inner.options.policy {
                SubmissionPolicy::Reject => {
                    log::debug!("pipeline: busy, submission rejected");
                    return Err(SubmitError::Busy);
                }
                SubmissionPolicy::Queue if core.queued.is_some() => {
                    log::debug!("pipeline: queue slot taken, submission rejected");
                    return Err(SubmitError::Busy);
                }
                SubmissionPolicy::Queue => {
                    log::debug!("pipeline: busy, submission queued");
                    core.queued = Some(Pending { prompt, reply });
                    return Ok(TurnHandle { rx, queued: true });
                }
            },
            PipelineState::Speaking => {
                log::debug!("pipeline: new prompt interrupts speech");
                self.inner.voice.stop();
                // An older prompt is waiting: it goes first, this one waits.
                if let Some(Pending { prompt: older, reply: older_reply }) = core.queued.take() {
                    Inner::start_turn(&self.inner, &mut core, older, older_reply);
                    core.queued = Some(Pending { prompt, reply });
                    return Ok(TurnHandle { rx, queued: true });
                }
            }
            PipelineState::Idle | PipelineState::Failed(_) => {}
        }

        Inner::start_turn(&self.inner, &mut core, prompt, reply);
        Ok(TurnHandle { rx, queued: false })
    }

    /// Submit the current draft (the UI's input field).
    pub fn submit_draft(&self) -> Result<TurnHandle, SubmitError> {
        let draft = self.inner.lock_core().draft.clone();
        self.submit(draft)
    }

    /// Abandon the pending model call or the current speech.
    ///
    /// AwaitingResponse → Idle (the call is aborted and a late result is
    /// discarded).  Speaking → Idle (speech stops; the turn stays in
    /// history).  Either way the queue slot is cleared and its handle
    /// resolves `Cancelled`.  Returns `false` when there was nothing to
    /// cancel.
    pub fn cancel(&self) -> bool {
        let mut core = self.inner.lock_core();

        match core.state.clone() {
            PipelineState::AwaitingResponse => {
                core.generation += 1;
                if let Some(task) = core.task.take() {
                    task.abort();
                }
                log::info!("pipeline: pending response cancelled");
            }
            PipelineState::Speaking => {
                core.generation += 1;
                core.task = None;
                self.inner.voice.stop();
                log::info!("pipeline: speech cancelled");
            }
            PipelineState::Idle | PipelineState::Failed(_) => return false,
        }

        if core.queued.take().is_some() {
            log::debug!("pipeline: queued prompt dropped");
        }
        core.state = PipelineState::Idle;
        self.inner.publish(&core);
        true
    }

    /// Failed → Idle.  Returns `false` in any other state.
    pub fn reset(&self) -> bool {
        let mut core = self.inner.lock_core();
        if !matches!(core.state, PipelineState::Failed(_)) {
            return false;
        }
        core.state = PipelineState::Idle;
        self.inner.publish(&core);
        true
    }

    /// Replace the draft text.
    pub fn set_draft(&self, text: impl Into<String>) {
        let mut core = self.inner.lock_core();
        core.draft = text.into();
        self.inner.publish(&core);
    }

    /// Highlight a turn.  Unknown ids return `None` and change nothing.
    pub fn select(&self, id: TurnId) -> Option<Turn> {
        let mut core = self.inner.lock_core();
        let turn = core.history.select(id).cloned();
        if turn.is_some() {
            self.inner.publish(&core);
        }
        turn
    }

    /// Silence the current utterance.  The turn then finishes normally.
    pub fn stop_speaking(&self) {
        self.inner.voice.stop();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Receive a snapshot after every change.
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.inner.snapshots.subscribe()
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.inner.snapshots.borrow().clone()
    }

    pub fn state(&self) -> PipelineState {
        self.inner.lock_core().state.clone()
    }

    pub fn history(&self) -> Vec<Turn> {
        self.inner.lock_core().history.all()
    }

    pub fn draft(&self) -> String {
        self.inner.lock_core().draft.clone()
    }
}

// ---------------------------------------------------------------------------
// Turn execution
// ---------------------------------------------------------------------------

impl Inner {
    fn lock_core(&self) -> MutexGuard<'_, Core> {
        self.core.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish the current state.  Called with the lock held so snapshots
    /// are delivered in mutation order.
    fn publish(&self, core: &Core) {
        self.snapshots.send_replace(core.snapshot());
    }

    fn start_turn(
        this: &Arc<Self>,
        core: &mut Core,
        prompt: String,
        reply: oneshot::Sender<TurnOutcome>,
    ) {
        core.generation += 1;
        core.state = PipelineState::AwaitingResponse;
        core.draft = prompt.clone();
        this.publish(core);

        log::info!("pipeline: prompt submitted ({} chars)", prompt.chars().count());

        let generation = core.generation;
        let inner = Arc::clone(this);
        core.task = Some(tokio::spawn(async move {
            inner.run_turn(generation, prompt, reply).await;
        }));
    }

    /// Start the queued prompt, if any.  Lock must be held.
    fn start_queued(this: &Arc<Self>, core: &mut Core) {
        if let Some(Pending { prompt, reply }) = core.queued.take() {
            Self::start_turn(this, core, prompt, reply);
        }
    }

    async fn run_turn(
        self: Arc<Self>,
        generation: u64,
        prompt: String,
        reply: oneshot::Sender<TurnOutcome>,
    ) {
        let result = match tokio::time::timeout(self.options.timeout, self.client.generate(&prompt))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                let outcome = {
                    let mut core = self.lock_core();
                    if core.generation != generation {
                        TurnOutcome::Cancelled
                    } else {
                        log::warn!("pipeline: model call failed: {err}");
                        core.state = PipelineState::Failed(err.to_string());
                        core.task = None;
                        // The failure and the failed prompt stay on screen;
                        // a waiting prompt is not started behind them.
                        if core.queued.take().is_some() {
                            log::info!("pipeline: queued prompt dropped after failure");
                        }
                        self.publish(&core);
                        TurnOutcome::Failed(err)
                    }
                };
                let _ = reply.send(outcome);
                return;
            }
        };

        let (turn, speech_epoch) = {
            let mut core = self.lock_core();
            if core.generation != generation {
                log::debug!("pipeline: discarding response of a cancelled turn");
                let _ = reply.send(TurnOutcome::Cancelled);
                return;
            }
            core.last_order += 1;
            let turn = Turn::new(prompt, response, core.last_order);
            core.history.append(turn.clone());
            core.state = PipelineState::Speaking;
            core.draft.clear();
            self.publish(&core);
            // Taken under the lock: a cancel from here on silences this turn.
            (turn, self.voice.stop_epoch())
        };

        log::info!("pipeline: turn {} completed", turn.id());

        self.voice.speak_from(speech_epoch, turn.response()).await;

        {
            let mut core = self.lock_core();
            if core.generation == generation {
                core.state = PipelineState::Idle;
                core.task = None;
                self.publish(&core);
                Self::start_queued(&self, &mut core);
            }
        }

        let _ = reply.send(TurnOutcome::Completed(turn));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
