//! Voice output — speaks model responses in their own language.
//!
//! # Flow
//!
//! ```text
//! VoiceOutput::speak(text)
//!   ├─ LanguageDetector::detect(text)         → None: log, skip
//!   ├─ AudioSession::configure(Playback)      → Err: log, skip
//!   └─ SpeechSynthesizer::speak(Utterance)    → Err: log
//! ```
//!
//! Every failure is logged and swallowed; speaking never fails the caller.
//!
//! `stop()` bumps a stop epoch.  An utterance started with
//! [`VoiceOutput::speak_from`] is abandoned as soon as the epoch moves past
//! the value it was given, even if the stop arrives while the language is
//! still being detected or the backend has not started playing yet.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use houdini::config::VoiceConfig;
//! use houdini::voice::VoiceOutput;
//!
//! #[tokio::main]
//! async fn main() {
//!     let voice = VoiceOutput::from_config(&VoiceConfig::default());
//!     voice.speak("Hi there").await;
//! }
//! ```

pub mod language;
pub mod session;
pub mod synth;

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;

use crate::config::VoiceConfig;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use language::{Language, LanguageDetector};
pub use session::{AudioSession, SessionCategory, SystemAudioSession};
pub use synth::{EspeakSynthesizer, SpeechSynthesizer, Utterance};

// test-only re-exports so the pipeline tests can build a silent VoiceOutput.
#[cfg(test)]
pub use session::MockSession;
#[cfg(test)]
pub use synth::MockSynthesizer;

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

/// Failures inside voice output.  Never surfaced past [`VoiceOutput`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpeechError {
    /// The dominant language of the text could not be identified.
    #[error("language detection failed")]
    Detection,

    /// The audio session could not be configured.
    #[error("audio session unavailable: {0}")]
    Session(String),

    /// The synthesis backend failed.
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),
}

// ---------------------------------------------------------------------------
// VoiceOutput
// ---------------------------------------------------------------------------

/// Best-effort text-to-speech.
pub struct VoiceOutput {
    detector: LanguageDetector,
    session: Arc<dyn AudioSession>,
    synth: Arc<dyn SpeechSynthesizer>,
    config: VoiceConfig,
    stops: watch::Sender<u64>,
}

impl VoiceOutput {
    pub fn new(
        config: VoiceConfig,
        session: Arc<dyn AudioSession>,
        synth: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            detector: LanguageDetector::new(),
            session,
            synth,
            config,
            stops: watch::channel(0).0,
        }
    }

    /// Production voice output: system audio session + `espeak-ng`.
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self::new(
            config.clone(),
            Arc::new(SystemAudioSession::new()),
            Arc::new(EspeakSynthesizer::new(config.espeak_binary.clone())),
        )
    }

    /// Replace the language detector.
    pub fn with_detector(mut self, detector: LanguageDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Speak `text`, returning once the utterance finishes or is stopped.
    ///
    /// Never fails: detection, session and synthesis errors are logged.
    pub async fn speak(&self, text: &str) {
        self.speak_from(self.stop_epoch(), text).await;
    }

    /// Current stop epoch.  Every [`stop`](Self::stop) increments it.
    pub fn stop_epoch(&self) -> u64 {
        *self.stops.borrow()
    }

    /// Speak `text` unless `stop()` has been called since `epoch` was read.
    ///
    /// A stop arriving at any point before the utterance ends abandons it.
    pub async fn speak_from(&self, epoch: u64, text: &str) {
        if !self.config.enabled {
            log::debug!("voice: disabled, not speaking");
            return;
        }

        let mut stops = self.stops.subscribe();
        if *stops.borrow_and_update() != epoch {
            log::debug!("voice: stopped before speaking");
            return;
        }

        let result = tokio::select! {
            biased;
            _ = stops.wait_for(|current| *current != epoch) => {
                log::debug!("voice: utterance abandoned");
                Ok(())
            }
            result = self.try_speak(text) => result,
        };

        if let Err(e) = result {
            log::warn!("voice: {e}; response not spoken");
        }
    }

    async fn try_speak(&self, text: &str) -> Result<(), SpeechError> {
        let language = self.detector.detect(text).ok_or(SpeechError::Detection)?;

        self.session.configure(SessionCategory::Playback)?;

        let utterance = Utterance {
            text: text.to_string(),
            language,
            voice: self.config.voice_for(language.code()),
            pitch: self.config.pitch,
            rate: self.config.rate,
        };

        log::debug!("voice: speaking in {language}");
        self.synth.speak(&utterance).await
    }

    /// Cut off any utterance in progress.  Safe to call when silent.
    pub fn stop(&self) {
        self.stops.send_modify(|epoch| *epoch += 1);
        self.synth.stop();
    }

    pub fn is_speaking(&self) -> bool {
        self.synth.is_speaking()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
