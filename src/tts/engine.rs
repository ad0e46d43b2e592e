//! Speech output service.
//!
//! All synthesis and playback happens on one dedicated thread that owns the
//! Kokoro model and the output stream. The session side only sends jobs and
//! receives [`SpeechEvent`]s, so `speak` never blocks the controller.
//!
//! Flushing works by generation: every `Flush` bumps a shared counter and
//! raises the halt flag. The thread drops any job from an older generation and
//! stops the one it is playing at the next sentence or playback check.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;

use anyhow::Result;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info, warn};

use super::synthesizer::{self, SAMPLE_RATE, Synthesizer, split_sentences};
use crate::audio::Player;
use crate::config::{self, AppConfig, VoiceLocale};
use crate::controller::services::{FlushPolicy, InitStatus, LocaleStatus, SpeechEvent, SpeechOutput, UtteranceTag};
use crate::error::SpeechError;

/// Work for the synthesis thread.
enum Job {
    Speak { text: String, tag: Option<UtteranceTag>, generation: u64 },
    SetLocale(&'static VoiceLocale),
}

/// Sentence synthesis as seen by the worker.
trait Voice {
    fn set_locale(&mut self, locale: &'static VoiceLocale);
    fn synthesize(&mut self, sentence: &str) -> Result<Vec<f32>>;
}

/// Blocking playback as seen by the worker.
trait Sink {
    /// Returns `false` if playback was halted or failed.
    fn play(&self, samples: &[f32]) -> bool;
}

/// Kokoro voice that rebuilds its model when the locale changes.
struct KokoroVoice {
    config: AppConfig,
    synth: Synthesizer,
    locale: &'static VoiceLocale,
}

impl Voice for KokoroVoice {
    fn set_locale(&mut self, locale: &'static VoiceLocale) {
        if std::ptr::eq(locale, self.locale) {
            return;
        }
        match Synthesizer::new(&self.config, locale) {
            Ok(synth) => {
                info!("🔊 Voice switched to {}", locale.language);
                self.synth = synth;
                self.locale = locale;
            }
            Err(e) => error!("❌ Failed to switch voice to {}: {:#}", locale.language, e),
        }
    }

    fn synthesize(&mut self, sentence: &str) -> Result<Vec<f32>> {
        self.synth.synthesize_sentence(sentence)
    }
}

impl Sink for Player {
    fn play(&self, samples: &[f32]) -> bool {
        Player::play(self, samples)
    }
}

/// Handle to the synthesis thread.
pub struct SpeechEngine {
    jobs: mpsc::Sender<Job>,
    generation: Arc<AtomicU64>, // Bumped on every flush
    halt: Arc<AtomicBool>,      // Cuts current playback
    data_dir: PathBuf,          // espeak-ng data of the selected engine
}

impl SpeechEngine {
    /// Start the synthesis thread for the engine selected in `config`.
    ///
    /// Initialization runs on that thread; its result arrives as
    /// [`SpeechEvent::Initialized`] on `events`.
    pub fn spawn(config: &AppConfig, events: UnboundedSender<SpeechEvent>) -> Self {
        let (jobs, job_rx) = mpsc::channel();
        let generation = Arc::new(AtomicU64::new(0));
        let halt = Arc::new(AtomicBool::new(false));

        let worker = Worker { events: events.clone(), generation: generation.clone(), halt: halt.clone() };
        let worker_config = config.clone();

        let spawned = std::thread::Builder::new().name("speech-output".to_string()).spawn(move || worker.run(&worker_config, job_rx));
        if let Err(e) = spawned {
            error!("Failed to spawn speech output thread: {}", e);
            let failed = SpeechEvent::Initialized(InitStatus::Failed(SpeechError::SynthesisInit(e.to_string())));
            if events.send(failed).is_err() {
                debug!("Speech event channel closed");
            }
        }

        Self { jobs, generation, halt, data_dir: config.tts_data_dir() }
    }
}

impl SpeechOutput for SpeechEngine {
    fn set_voice_locale(&mut self, tag: &str) -> LocaleStatus {
        let Some(locale) = config::get_locale(tag) else {
            warn!("Locale {} is not supported", tag);
            return LocaleStatus::Unsupported;
        };

        if !synthesizer::has_voice_data(&self.data_dir, locale) {
            warn!("Voice data '{}' not found in {}", locale.espeak_dict, self.data_dir.display());
            return LocaleStatus::MissingData;
        }

        if self.jobs.send(Job::SetLocale(locale)).is_err() {
            warn!("Speech output thread is gone");
        }
        LocaleStatus::Ok
    }

    fn speak(&mut self, text: &str, flush: FlushPolicy, tag: Option<UtteranceTag>) {
        let generation = match flush {
            FlushPolicy::Flush => {
                self.halt.store(true, Ordering::SeqCst);
                self.generation.fetch_add(1, Ordering::SeqCst) + 1
            }
            FlushPolicy::Queue => self.generation.load(Ordering::SeqCst),
        };

        if self.jobs.send(Job::Speak { text: text.to_string(), tag, generation }).is_err() {
            warn!("Speech output thread is gone, dropping utterance {:?}", tag);
        }
    }
}

/// State owned by the synthesis thread.
struct Worker {
    events: UnboundedSender<SpeechEvent>,
    generation: Arc<AtomicU64>,
    halt: Arc<AtomicBool>,
}

impl Worker {
    fn run(self, config: &AppConfig, jobs: mpsc::Receiver<Job>) {
        match self.load(config) {
            Ok((mut voice, player)) => {
                self.emit(SpeechEvent::Initialized(InitStatus::Ready));
                self.serve(&mut voice, &player, jobs);
            }
            Err(e) => {
                self.emit(SpeechEvent::Initialized(InitStatus::Failed(e)));
                self.reject(jobs);
            }
        }
        debug!("Speech output thread exiting");
    }

    /// Load the model and open the output device.
    fn load(&self, config: &AppConfig) -> Result<(KokoroVoice, Player), SpeechError> {
        let missing = synthesizer::missing_files(config);
        if !missing.is_empty() {
            let list = missing.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ");
            return Err(SpeechError::SynthesisInit(format!("engine '{}' not installed (missing {})", config.tts_engine, list)));
        }

        let locale = config.voice_locale().ok_or_else(|| SpeechError::SynthesisInit(format!("unsupported locale '{}'", config.locale)))?;
        let synth = Synthesizer::new(config, locale).map_err(|e| SpeechError::SynthesisInit(format!("{:#}", e)))?;
        let player = Player::new(SAMPLE_RATE, self.halt.clone()).map_err(SpeechError::audio)?;

        Ok((KokoroVoice { config: config.clone(), synth, locale }, player))
    }

    fn serve<V: Voice, S: Sink>(&self, voice: &mut V, sink: &S, jobs: mpsc::Receiver<Job>) {
        for job in jobs {
            match job {
                Job::SetLocale(locale) => voice.set_locale(locale),
                Job::Speak { text, tag, generation } => self.speak(voice, sink, &text, tag, generation),
            }
        }
    }

    /// Without an engine every utterance still gets a completion event.
    fn reject(&self, jobs: mpsc::Receiver<Job>) {
        for job in jobs {
            if let Job::Speak { tag, .. } = job {
                self.emit(SpeechEvent::Error(tag));
            }
        }
    }

    fn speak<V: Voice, S: Sink>(&self, voice: &mut V, sink: &S, text: &str, tag: Option<UtteranceTag>, generation: u64) {
        if self.is_stale(generation) {
            self.emit(SpeechEvent::Stopped(tag));
            return;
        }
        self.halt.store(false, Ordering::SeqCst);
        self.emit(SpeechEvent::Started(tag));

        for sentence in split_sentences(text) {
            if self.is_stale(generation) {
                self.emit(SpeechEvent::Stopped(tag));
                return;
            }

            let samples = match voice.synthesize(&sentence) {
                Ok(samples) => samples,
                Err(e) => {
                    error!("❌ TTS error: {:#}", e);
                    self.emit(SpeechEvent::Error(tag));
                    return;
                }
            };

            if !sink.play(&samples) {
                let event = if self.is_stale(generation) { SpeechEvent::Stopped(tag) } else { SpeechEvent::Error(tag) };
                self.emit(event);
                return;
            }
        }

        // A flush that lands after the last sentence still counts
        if self.is_stale(generation) {
            self.emit(SpeechEvent::Stopped(tag));
            return;
        }

        debug!("🔊 Finished utterance {:?}", tag);
        self.emit(SpeechEvent::Done(tag));
    }

    fn is_stale(&self, generation: u64) -> bool {
        generation < self.generation.load(Ordering::SeqCst)
    }

    fn emit(&self, event: SpeechEvent) {
        if self.events.send(event).is_err() {
            debug!("Speech event channel closed");
        }
    }
}
