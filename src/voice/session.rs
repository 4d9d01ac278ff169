//! Audio output session set-up performed before every utterance.
//!
//! [`SystemAudioSession`] checks that the default output device can play
//! audio.  With the `audio-device` feature the device is probed through
//! `cpal`; without it the session assumes the speech backend handles device
//! routing itself.

use crate::voice::SpeechError;

/// How the session will be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCategory {
    /// Audible output that plays even when other audio is active.
    Playback,
}

/// Prepares the device for speech output.
pub trait AudioSession: Send + Sync {
    /// Configure and activate the session for `category`.
    fn configure(&self, category: SessionCategory) -> Result<(), SpeechError>;
}

/// Default-output-device session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAudioSession;

impl SystemAudioSession {
    pub fn new() -> Self {
        Self
    }
}

impl AudioSession for SystemAudioSession {
    fn configure(&self, category: SessionCategory) -> Result<(), SpeechError> {
        log::debug!("audio session: configuring for {category:?}");
        probe_output_device()
    }
}

#[cfg(feature = "audio-device")]
fn probe_output_device() -> Result<(), SpeechError> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| SpeechError::Session("no output device found on the default audio host".into()))?;

    let supported = device
        .default_output_config()
        .map_err(|e| SpeechError::Session(format!("failed to query default output config: {e}")))?;

    log::debug!(
        "audio session: output {} Hz, {} ch",
        supported.sample_rate().0,
        supported.channels()
    );
    Ok(())
}

#[cfg(not(feature = "audio-device"))]
fn probe_output_device() -> Result<(), SpeechError> {
    Ok(())
}

/// Test double: succeeds or fails on demand.
#[cfg(test)]
pub struct MockSession {
    fail: bool,
}

#[cfg(test)]
impl MockSession {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[cfg(test)]
impl AudioSession for MockSession {
    fn configure(&self, _category: SessionCategory) -> Result<(), SpeechError> {
        if self.fail {
            Err(SpeechError::Session("mock: no output device".into()))
        } else {
            Ok(())
        }
    }
}
