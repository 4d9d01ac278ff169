//! Speech synthesis backends.
//!
//! [`SpeechSynthesizer`] speaks one [`Utterance`] at a time and can be
//! interrupted with [`SpeechSynthesizer::stop`].  [`EspeakSynthesizer`] runs
//! the `espeak-ng` executable, feeding the text on stdin; stopping kills the
//! process.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::oneshot;

use crate::voice::{Language, SpeechError};

// ---------------------------------------------------------------------------
// Utterance
// ---------------------------------------------------------------------------

/// Everything a backend needs to speak one piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    pub language: Language,
    /// Backend voice name (defaults to the language code).
    pub voice: String,
    /// Pitch multiplier, 1.0 = natural.
    pub pitch: f32,
    /// Normalised rate, 0.5 = normal.
    pub rate: f32,
}

// ---------------------------------------------------------------------------
// SpeechSynthesizer trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Speak `utterance`, resolving once it has finished or been stopped.
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError>;

    /// Stop the current utterance immediately.  No-op when silent.
    fn stop(&self);

    fn is_speaking(&self) -> bool;
}

// ---------------------------------------------------------------------------
// EspeakSynthesizer
// ---------------------------------------------------------------------------

/// espeak-ng default pitch (0 – 99).
const ESPEAK_BASE_PITCH: f32 = 50.0;
/// espeak-ng default speed in words per minute.
const ESPEAK_BASE_WPM: f32 = 175.0;
const ESPEAK_MIN_WPM: f32 = 80.0;
const ESPEAK_MAX_WPM: f32 = 450.0;

/// Map a pitch multiplier onto espeak's 0 – 99 scale.
fn espeak_pitch(multiplier: f32) -> u32 {
    (ESPEAK_BASE_PITCH * multiplier).round().clamp(0.0, 99.0) as u32
}

/// Map a normalised rate (0.5 = normal) onto words per minute.
fn espeak_words_per_minute(rate: f32) -> u32 {
    (ESPEAK_BASE_WPM * rate / 0.5)
        .round()
        .clamp(ESPEAK_MIN_WPM, ESPEAK_MAX_WPM) as u32
}

/// Text-to-speech through the `espeak-ng` command line tool.
pub struct EspeakSynthesizer {
    binary: String,
    /// Stop signal for the utterance currently playing, tagged with its id.
    current: Mutex<Option<(u64, oneshot::Sender<()>)>>,
    next_id: AtomicU64,
}

impl EspeakSynthesizer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            current: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    /// Command-line arguments for `utterance`; the text itself goes to stdin.
    fn args(utterance: &Utterance) -> Vec<String> {
        vec![
            "-v".into(),
            utterance.voice.clone(),
            "-p".into(),
            espeak_pitch(utterance.pitch).to_string(),
            "-s".into(),
            espeak_words_per_minute(utterance.rate).to_string(),
            "--stdin".into(),
        ]
    }

    fn finish(&self, id: u64) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        if matches!(current.as_ref(), Some((active, _)) if *active == id) {
            *current = None;
        }
    }
}

/// Clears the utterance registration however `speak` ends, including when
/// its future is dropped mid-utterance.
struct Registration<'a> {
    synth: &'a EspeakSynthesizer,
    id: u64,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.synth.finish(self.id);
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSynthesizer {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        // A new utterance interrupts the previous one.
        self.stop();

        // Registered before the process exists so a stop issued while it is
        // starting still reaches it.
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (stop_tx, mut stop_rx) = oneshot::channel();
        *self.current.lock().unwrap_or_else(|e| e.into_inner()) = Some((id, stop_tx));
        let _registration = Registration { synth: self, id };

        let mut child = Command::new(&self.binary)
            .args(Self::args(utterance))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpeechError::Synthesis(format!("cannot start {}: {e}", self.binary)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let written = tokio::select! {
                written = stdin.write_all(utterance.text.as_bytes()) => written,
                _ = &mut stop_rx => {
                    log::debug!("espeak: utterance stopped before playback");
                    let _ = child.kill().await;
                    return Ok(());
                }
            };
            if let Err(e) = written {
                return Err(SpeechError::Synthesis(format!("cannot write text: {e}")));
            }
            // Dropping stdin closes it so espeak starts speaking.
        }

        log::debug!(
            "espeak: speaking {} chars as {:?}",
            utterance.text.chars().count(),
            utterance.voice
        );

        tokio::select! {
            status = child.wait() => match status {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(SpeechError::Synthesis(format!("{} exited with {status}", self.binary))),
                Err(e) => Err(SpeechError::Synthesis(e.to_string())),
            },
            _ = stop_rx => {
                log::debug!("espeak: utterance stopped");
                let _ = child.kill().await;
                Ok(())
            }
        }
    }

    fn stop(&self) {
        let current = self
            .current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some((_, stop_tx)) = current {
            let _ = stop_tx.send(());
        }
    }

    fn is_speaking(&self) -> bool {
        self.current
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

// ---------------------------------------------------------------------------
// MockSynthesizer  (test-only)
// ---------------------------------------------------------------------------

/// A test double that records utterances instead of producing audio.
///
/// `holding()` keeps every utterance "playing" until [`stop`] is called,
/// which lets tests observe the pipeline while it is speaking.
///
/// [`stop`]: SpeechSynthesizer::stop
#[cfg(test)]
pub struct MockSynthesizer {
    spoken: Mutex<Vec<Utterance>>,
    fail: bool,
    hold: bool,
    stops: std::sync::atomic::AtomicUsize,
    active: std::sync::atomic::AtomicUsize,
    stop_epoch: tokio::sync::watch::Sender<u64>,
}

#[cfg(test)]
impl MockSynthesizer {
    fn build(fail: bool, hold: bool) -> Self {
        let (stop_epoch, _) = tokio::sync::watch::channel(0);
        Self {
            spoken: Mutex::new(Vec::new()),
            fail,
            hold,
            stops: Default::default(),
            active: Default::default(),
            stop_epoch,
        }
    }

    /// Finishes every utterance immediately.
    pub fn ok() -> Self {
        Self::build(false, false)
    }

    /// Records the utterance, then reports a synthesis error.
    pub fn failing() -> Self {
        Self::build(true, false)
    }

    /// Speaks until stopped.
    pub fn holding() -> Self {
        Self::build(false, true)
    }

    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken().into_iter().map(|u| u.text).collect()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

/// Decrements the active count when a held utterance ends or is dropped.
#[cfg(test)]
struct ActiveGuard<'a>(&'a std::sync::atomic::AtomicUsize);

#[cfg(test)]
impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        self.spoken.lock().unwrap().push(utterance.clone());
        if self.fail {
            return Err(SpeechError::Synthesis("mock failure".into()));
        }
        if self.hold {
            let mut epoch = self.stop_epoch.subscribe();
            let started = *epoch.borrow();
            self.active.fetch_add(1, Ordering::SeqCst);
            let _active = ActiveGuard(&self.active);
            let _ = epoch.wait_for(|e| *e > started).await;
        }
        Ok(())
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.stop_epoch.send_modify(|e| *e += 1);
    }

    fn is_speaking(&self) -> bool {
        self.active.load(Ordering::SeqCst) > 0
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
