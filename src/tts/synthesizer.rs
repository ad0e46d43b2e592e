//! Text-to-speech synthesizer using Kokoro models.

use std::path::{Path, PathBuf};

use anyhow::Result;
use sherpa_rs::OnnxConfig;
use sherpa_rs::tts::{CommonTtsConfig, KokoroTts, KokoroTtsConfig};
use tracing::{debug, info};

use crate::config::{AppConfig, VoiceLocale};

/// Kokoro output sample rate.
pub const SAMPLE_RATE: u32 = 24000;

/// Text-to-speech synthesizer using Kokoro models.
pub struct Synthesizer {
    tts: KokoroTts,  // Kokoro TTS engine
    speaker_id: i32, // Speaker/voice identifier
    speed: f32,      // Speech speed multiplier
}

impl Synthesizer {
    /// Load the Kokoro model for `locale`.
    ///
    /// Callers must check [`missing_files`] first: the underlying engine does
    /// not report missing model files gracefully.
    pub fn new(config: &AppConfig, locale: &VoiceLocale) -> Result<Self> {
        let provider = config.effective_tts_provider();
        let speaker_id = config.speaker_id(locale);

        info!("Initializing Kokoro TTS synthesizer with {} provider", provider);
        info!("TTS language: {} (speaker ID: {})", locale.language, speaker_id);

        let tts_config = KokoroTtsConfig {
            model: config.tts_model_path().to_string_lossy().to_string(),
            voices: config.tts_voices_path().to_string_lossy().to_string(),
            tokens: config.tts_tokens_path().to_string_lossy().to_string(),
            data_dir: config.tts_data_dir().to_string_lossy().to_string(),
            dict_dir: config.tts_dict_dir().to_string_lossy().to_string(),
            lexicon: config.tts_lexicon(locale),
            lang: config.tts_language(locale),
            length_scale: 1.0 / config.tts_speed, // length_scale is inverse of speed
            onnx_config: OnnxConfig {
                provider: provider.as_sherpa_provider().to_string(),
                num_threads: config.tts_threads.try_into().unwrap_or(2),
                debug: config.verbose,
            },
            common_config: CommonTtsConfig { max_num_sentences: 1, ..Default::default() }, // Kokoro only supports 1
        };

        let tts = KokoroTts::new(tts_config);

        Ok(Self { tts, speaker_id, speed: config.tts_speed })
    }

    /// Synthesize a single sentence.
    ///
    /// # Errors
    /// Returns an error if TTS generation fails.
    pub fn synthesize_sentence(&mut self, sentence: &str) -> Result<Vec<f32>> {
        if sentence.trim().is_empty() {
            return Ok(Vec::new());
        }

        debug!("Synthesizing sentence: \"{}\"", sentence);

        let audio = self.tts.create(sentence, self.speaker_id, self.speed).map_err(|e| anyhow::anyhow!("TTS generation failed: {}", e))?;

        debug!("🎵 Generated speech ({} samples)", audio.samples.len());
        Ok(audio.samples)
    }
}

/// Engine files that do not exist.
pub fn missing_files(config: &AppConfig) -> Vec<PathBuf> {
    config.tts_model_files().into_iter().filter(|path| !path.exists()).collect()
}

/// Whether the espeak-ng data for `locale` is installed under `data_dir`.
pub fn has_voice_data(data_dir: &Path, locale: &VoiceLocale) -> bool {
    !locale.lexicons.is_empty() || data_dir.join(locale.espeak_dict).exists()
}

/// Split text into sentences for streaming synthesis.
///
/// A period right after a digit ("1. Bagian ...") is a list marker, not a boundary.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut prev = None;

    for c in text.chars() {
        current.push(c);

        let list_marker = c == '.' && prev.is_some_and(|p: char| p.is_ascii_digit());
        if matches!(c, '.' | '!' | '?' | '\n') && !list_marker {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
        prev = Some(c);
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}
