//! Single-utterance speech recognizer combining VAD and Whisper.
//!
//! A fresh Silero VAD is built per request and fed from the microphone until it
//! closes one speech segment; that segment is transcribed with Whisper.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::{Duration, Instant};

use anyhow::Result;
use parking_lot::Mutex;
use sherpa_rs::silero_vad::{SileroVad, SileroVadConfig};
use sherpa_rs::whisper::{WhisperConfig, WhisperRecognizer};
use tracing::{debug, info};

use crate::audio::Capturer;
use crate::config::{self, AppConfig};
use crate::controller::services::RecognitionRequest;
use crate::error::SpeechError;

/// Minimum speech duration in seconds to be considered valid.
const MIN_SPEECH_DURATION: f32 = 0.1;

/// Maximum speech duration in seconds (prevent runaway segments).
const MAX_SPEECH_DURATION: f32 = 30.0;

/// VAD window size in samples (512 samples = 32ms at 16kHz).
const VAD_WINDOW_SIZE: i32 = 512;

/// Buffer size in seconds for VAD (how much audio to accumulate).
const VAD_BUFFER_SIZE_SECONDS: f32 = 60.0;

/// How often the listening loop wakes up to check timeouts.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Whisper instance and the language it was built for.
struct Whisper {
    recognizer: WhisperRecognizer,
    language: String,
}

/// Speech recognizer for one utterance at a time.
pub struct Recognizer {
    config: AppConfig,
    whisper: Mutex<Whisper>,
    listen_timeout: Duration,
}

impl Recognizer {
    /// Load Whisper for the configured locale.
    ///
    /// # Errors
    /// Returns `RecognizerUnavailable` if model files are missing or Whisper fails to load.
    pub fn new(config: &AppConfig) -> Result<Self, SpeechError> {
        let missing: Vec<String> = config.stt_model_files().iter().filter(|p| !p.exists()).map(|p| p.display().to_string()).collect();
        if !missing.is_empty() {
            return Err(SpeechError::RecognizerUnavailable(format!("missing {}", missing.join(", "))));
        }

        let language = config::whisper_language(&config.locale);
        let recognizer = build_whisper(config, &language).map_err(|e| SpeechError::RecognizerUnavailable(format!("{:#}", e)))?;

        Ok(Self {
            config: config.clone(),
            whisper: Mutex::new(Whisper { recognizer, language }),
            listen_timeout: Duration::from_secs_f32(config.listen_timeout),
        })
    }

    /// Capture and transcribe one utterance.
    ///
    /// Returns `None` when speech was captured but Whisper produced no text.
    /// Fails with `NoSpeech` if nothing is said within the listen timeout.
    pub fn recognize(&self, request: &RecognitionRequest) -> Result<Option<String>, SpeechError> {
        info!("🎤 {}", request.prompt);
        debug!("Recognition request: locale={}, model={:?}", request.locale, request.language_model);

        self.ensure_language(&config::whisper_language(&request.locale))?;
        let samples = self.capture_utterance()?;
        Ok(self.transcribe(&samples))
    }

    /// Rebuild Whisper if the request's language differs from the loaded one.
    fn ensure_language(&self, language: &str) -> Result<(), SpeechError> {
        let mut whisper = self.whisper.lock();
        if whisper.language == language {
            return Ok(());
        }

        info!("Switching recognizer language {} -> {}", whisper.language, language);
        whisper.recognizer = build_whisper(&self.config, language).map_err(|e| SpeechError::Recognition(format!("{:#}", e)))?;
        whisper.language = language.to_string();
        Ok(())
    }

    /// Listen until the VAD closes one speech segment.
    fn capture_utterance(&self) -> Result<Vec<f32>, SpeechError> {
        let mut vad = self.build_vad().map_err(|e| SpeechError::Recognition(format!("{:#}", e)))?;
        let speaking = Arc::new(AtomicBool::new(false));
        let (segment_tx, segment_rx) = mpsc::sync_channel::<Vec<f32>>(1);

        let callback_speaking = speaking.clone();
        let mut capturer = Capturer::start(self.config.sample_rate, move |samples: &[f32]| {
            vad.accept_waveform(samples.to_vec());

            if vad.is_speech() && !callback_speaking.swap(true, Ordering::SeqCst) {
                info!("🎤 Speech started");
            }

            if !vad.is_empty() {
                let segment = vad.front();
                vad.pop();
                if !segment.samples.is_empty() {
                    // Only the first segment matters; later ones are dropped
                    let _ = segment_tx.try_send(segment.samples);
                }
            }
        })
        .map_err(SpeechError::audio)?;

        let max_wait = self.listen_timeout + Duration::from_secs_f32(MAX_SPEECH_DURATION + self.config.vad_silence_duration);
        let result = wait_for_segment(&segment_rx, &speaking, self.listen_timeout, max_wait);

        capturer.stop();

        if let Ok(samples) = &result {
            let secs = samples.len() as f32 / self.config.sample_rate as f32;
            info!("🎤 Speech ended ({:.1}s)", secs);
        }
        result
    }

    /// Transcribe a speech segment. Returns `None` if Whisper heard nothing.
    fn transcribe(&self, samples: &[f32]) -> Option<String> {
        debug!("Transcribing {} samples", samples.len());

        let mut whisper = self.whisper.lock();
        let result = whisper.recognizer.transcribe(self.config.sample_rate, samples);
        drop(whisper);

        let text = result.text.trim();
        if text.is_empty() {
            debug!("Empty transcription result");
            return None;
        }
        Some(text.to_string())
    }

    fn build_vad(&self) -> Result<SileroVad> {
        let provider = self.config.effective_stt_provider();
        let vad_config = SileroVadConfig {
            model: self.config.vad_model_path().to_string_lossy().to_string(),
            threshold: self.config.vad_threshold,
            sample_rate: self.config.sample_rate,
            min_silence_duration: self.config.vad_silence_duration,
            min_speech_duration: MIN_SPEECH_DURATION,
            max_speech_duration: MAX_SPEECH_DURATION,
            window_size: VAD_WINDOW_SIZE,
            provider: Some(provider.as_sherpa_provider().to_string()),
            num_threads: Some(1),
            debug: self.config.verbose,
        };

        SileroVad::new(vad_config, VAD_BUFFER_SIZE_SECONDS).map_err(|e| anyhow::anyhow!("Failed to initialize Silero VAD: {}", e))
    }
}

/// Wait for the VAD to hand over one closed segment.
///
/// Gives up with `NoSpeech` if speech has not started within `listen_timeout`,
/// and with `Recognition` once `max_wait` has passed in total, which covers an
/// input stream that stops delivering samples mid-utterance.
fn wait_for_segment(
    segments: &mpsc::Receiver<Vec<f32>>,
    speaking: &AtomicBool,
    listen_timeout: Duration,
    max_wait: Duration,
) -> Result<Vec<f32>, SpeechError> {
    let started = Instant::now();
    loop {
        match segments.recv_timeout(POLL_INTERVAL) {
            Ok(samples) => return Ok(samples),
            Err(RecvTimeoutError::Timeout) => {
                let elapsed = started.elapsed();
                if !speaking.load(Ordering::SeqCst) && elapsed > listen_timeout {
                    return Err(SpeechError::NoSpeech(listen_timeout));
                }
                if elapsed > max_wait {
                    return Err(SpeechError::Recognition(format!("no end of speech after {:.1}s", max_wait.as_secs_f32())));
                }
            }
            Err(RecvTimeoutError::Disconnected) => return Err(SpeechError::Audio("capture stopped unexpectedly".to_string())),
        }
    }
}

fn build_whisper(config: &AppConfig, language: &str) -> Result<WhisperRecognizer> {
    let provider = config.effective_stt_provider();
    info!("Initializing Whisper ({}) with {} provider", language, provider);

    let whisper_config = WhisperConfig {
        encoder: config.whisper_encoder_path().to_string_lossy().to_string(),
        decoder: config.whisper_decoder_path().to_string_lossy().to_string(),
        tokens: config.whisper_tokens_path().to_string_lossy().to_string(),
        language: language.to_string(),
        provider: Some(provider.as_sherpa_provider().to_string()),
        num_threads: Some(config.stt_threads.try_into().unwrap_or(2)),
        debug: config.verbose,
        ..Default::default()
    };

    WhisperRecognizer::new(whisper_config).map_err(|e| anyhow::anyhow!("Failed to initialize Whisper: {}", e))
}
