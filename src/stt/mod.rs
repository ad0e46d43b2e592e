//! Speech input: Silero VAD + Whisper through sherpa-rs, one utterance per request.

mod listener;
mod recognizer;

pub use listener::ListeningService;
pub use recognizer::Recognizer;
