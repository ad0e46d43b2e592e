//! Error types shared by the speech services.
//!
//! None of these are fatal: every failure ends up reported to the user through
//! the same speech and text channels used for normal responses.

use std::time::Duration;

use thiserror::Error;

/// Failures reported by the speech output and speech input services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpeechError {
    /// The synthesis engine could not be loaded; the menu stays inert.
    #[error("speech synthesis engine failed to initialize: {0}")]
    SynthesisInit(String),

    /// The engine is present but lacks language data for the locale.
    #[error("voice data for locale '{0}' is missing")]
    VoiceDataMissing(String),

    /// The locale is not in the supported locale table.
    #[error("locale '{0}' is not supported")]
    UnsupportedLocale(String),

    /// No recognition models or no microphone.
    #[error("speech recognizer unavailable: {0}")]
    RecognizerUnavailable(String),

    /// The user did not start speaking before the listen timeout.
    #[error("no speech detected within {:.1}s", .0.as_secs_f32())]
    NoSpeech(Duration),

    /// Transcription or VAD failure.
    #[error("speech recognition failed: {0}")]
    Recognition(String),

    /// Audio device failure (open, configure, or stream).
    #[error("audio device error: {0}")]
    Audio(String),
}

impl SpeechError {
    /// Wrap an `anyhow` chain as an audio error, keeping every cause in the message.
    pub fn audio(err: anyhow::Error) -> Self {
        SpeechError::Audio(format!("{:#}", err))
    }
}
