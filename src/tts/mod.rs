//! Speech output: Kokoro synthesis through sherpa-rs, played on the default device.

mod engine;
mod synthesizer;

pub use engine::SpeechEngine;
