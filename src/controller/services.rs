//! Contracts between the turn controller and the services it drives.
//!
//! The controller only ever calls these traits; the real implementations live in
//! `tts`, `stt` and `ui`, and tests substitute recording fakes. Services report
//! asynchronous completions back as [`SpeechEvent`] and [`RecognitionOutcome`]
//! values, which the session loop feeds into the controller.

use crate::error::SpeechError;

/// Correlates a speech request with its completion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceTag {
    /// The menu read out at the start of a turn; its completion starts recognition.
    TurnPrompt,
    /// The echo of unclassified input. Nothing consumes its completion.
    RetryPrompt,
}

/// What to do with utterances already queued when a new one is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushPolicy {
    /// Drop queued utterances and cut the one playing.
    #[default]
    Flush,
    /// Append after everything already queued.
    Queue,
}

/// Result of initializing the synthesis engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitStatus {
    Ready,
    Failed(SpeechError),
}

/// Result of selecting a voice locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleStatus {
    Ok,
    MissingData,
    Unsupported,
}

/// Notifications emitted by the speech output service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// Engine initialization finished (successfully or not).
    Initialized(InitStatus),
    /// Playback of an utterance began.
    Started(Option<UtteranceTag>),
    /// An utterance was spoken to the end.
    Done(Option<UtteranceTag>),
    /// An utterance could not be synthesized or played.
    Error(Option<UtteranceTag>),
    /// An utterance was dropped or cut short by a flush. Never followed by `Done`.
    Stopped(Option<UtteranceTag>),
}

/// Recognition mode hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LanguageModel {
    /// No grammar constraint on the expected utterance.
    #[default]
    FreeForm,
    /// Short, query-like utterances.
    WebSearch,
}

/// A single recognition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    pub locale: String,
    pub language_model: LanguageModel,
    pub prompt: String,
}

/// The asynchronous answer to a [`RecognitionRequest`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionOutcome {
    /// Best transcription of the captured utterance, passed on verbatim.
    Success(String),
    /// Speech was captured but the recognizer produced no transcription.
    NoResult,
    Failure(SpeechError),
}

/// Something the user has to fix outside the program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// The selected synthesis engine is not installed.
    InstallSynthesisEngine,
    /// Language data for the voice locale is missing.
    InstallVoiceData { locale: String },
    /// No speech recognizer is available.
    InstallRecognizer,
}

/// Speech synthesis service.
pub trait SpeechOutput {
    /// Select the voice language. Only meaningful once the engine is ready.
    fn set_voice_locale(&mut self, locale: &str) -> LocaleStatus;

    /// Queue `text` for speaking. Completion is reported as a [`SpeechEvent`] carrying `tag`.
    fn speak(&mut self, text: &str, flush: FlushPolicy, tag: Option<UtteranceTag>);
}

/// Speech recognition service.
pub trait SpeechInput {
    fn is_available(&self) -> bool;

    /// Start listening for one utterance. Exactly one [`RecognitionOutcome`] follows.
    fn request_recognition(&mut self, request: RecognitionRequest);
}

/// The single-screen presentation surface.
pub trait Presenter {
    /// Replace the text region. An empty string shows the menu note.
    fn show_text(&mut self, text: &str);

    fn set_trigger_enabled(&mut self, enabled: bool);

    fn direct(&mut self, directive: Directive);
}
