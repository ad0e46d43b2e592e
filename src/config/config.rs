//! Application configuration and CLI argument parsing.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::locales::{self, VoiceLocale};

/// Hardware acceleration provider for ONNX models.
/// Auto-detected based on platform if not specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// CPU inference (default fallback, always available)
    #[default]
    Cpu,
    /// NVIDIA CUDA acceleration (Linux only, requires CUDA toolkit)
    Cuda,
    /// Apple CoreML acceleration (macOS only, uses Neural Engine)
    #[value(name = "coreml")]
    CoreMl,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sherpa_provider())
    }
}

impl Provider {
    /// Provider string compatible with sherpa-rs.
    pub fn as_sherpa_provider(&self) -> &'static str {
        match self {
            Provider::Cpu => "cpu",
            Provider::Cuda => "cuda",
            Provider::CoreMl => "coreml",
        }
    }
}

/// Voice menu application configuration.
#[derive(Parser, Debug, Clone, Serialize, Deserialize)]
#[command(name = "voice-menu")]
#[command(author, version, about = "A spoken menu that listens for a numeric choice", long_about = None)]
pub struct AppConfig {
    /// List all supported voice locales and exit
    #[arg(long)]
    #[serde(skip)]
    pub list_locales: bool,

    /// Show detailed information about a specific locale and exit
    #[arg(long)]
    #[serde(skip)]
    pub locale_info: Option<String>,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    #[serde(skip)]
    pub print_config: bool,

    /// Directory containing model files (Whisper, VAD, TTS)
    #[arg(long, short = 'd', env = "MODEL_DIR", default_value_os_t = default_model_dir())]
    pub model_dir: PathBuf,

    /// Locale used for both the synthesized voice and speech recognition
    #[arg(long, short = 'l', env = "VOICE_MENU_LOCALE", default_value = "id-ID")]
    pub locale: String,

    /// Speech synthesis engine: name of a model directory under <model-dir>/tts
    #[arg(long, default_value = "kokoro-multi-lang-v1_0")]
    pub tts_engine: String,

    /// Text-to-speech speed multiplier
    #[arg(long, default_value = "1.0")]
    pub tts_speed: f32,

    /// Kokoro speaker ID (defaults to the locale's speaker)
    #[arg(long)]
    pub tts_speaker_id: Option<i32>,

    /// Audio sample rate for speech recognition
    #[arg(long, default_value = "16000")]
    pub sample_rate: u32,

    /// Voice activity detection threshold (0.0 - 1.0)
    #[arg(long, default_value = "0.5")]
    pub vad_threshold: f32,

    /// VAD silence duration in seconds (how long to wait before considering speech ended)
    #[arg(long, default_value = "0.8")]
    pub vad_silence_duration: f32,

    /// Seconds to wait for the user to start speaking before the request fails
    #[arg(long, default_value = "8.0", value_parser = parse_positive_secs)]
    pub listen_timeout: f32,

    /// Hardware acceleration provider (auto-detected if not specified)
    #[arg(long, value_enum)]
    pub provider: Option<Provider>,

    /// Provider for STT (overrides --provider for speech recognition)
    #[arg(long, value_enum)]
    pub stt_provider: Option<Provider>,

    /// Provider for TTS (overrides --provider for speech synthesis)
    #[arg(long, value_enum)]
    pub tts_provider: Option<Provider>,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Number of threads for all models (0 = auto-detect based on CPU cores)
    #[arg(long, default_value = "0")]
    pub num_threads: usize,

    /// STT threads (0 = use num_threads)
    #[arg(long, default_value = "0")]
    pub stt_threads: usize,

    /// TTS threads (0 = use num_threads)
    #[arg(long, default_value = "0")]
    pub tts_threads: usize,
}

impl AppConfig {
    /// Parse configuration from command line arguments.
    ///
    /// Informational flags (`--list-locales`, `--locale-info`, `--print-config`)
    /// print and exit here.
    pub fn from_args() -> Self {
        let mut config = Self::parse();

        if config.list_locales {
            locales::print_locales();
            std::process::exit(0);
        }

        if let Some(ref tag) = config.locale_info {
            match locales::print_locale_info(tag) {
                Ok(_) => std::process::exit(0),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        config.normalize_thread_counts();

        if config.print_config {
            match serde_json::to_string_pretty(&config) {
                Ok(json) => {
                    println!("{}", json);
                    std::process::exit(0);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Auto-detect thread counts from CPU cores and provider.
    ///
    /// With CUDA a single thread is used per model since the GPU handles
    /// parallelism. On CPU the two models share cores/2 each, as only one of
    /// them is busy at any point of a turn.
    fn normalize_thread_counts(&mut self) {
        let cpu_cores = num_cpus::get();
        let using_cuda = self.effective_stt_provider() == Provider::Cuda || self.effective_tts_provider() == Provider::Cuda;

        if self.num_threads == 0 {
            self.num_threads = if using_cuda { 1 } else { (cpu_cores / 2).max(1) };
        }

        if self.stt_threads == 0 {
            self.stt_threads = if self.effective_stt_provider() == Provider::Cuda { 1 } else { self.num_threads };
        }

        if self.tts_threads == 0 {
            self.tts_threads = if self.effective_tts_provider() == Provider::Cuda { 1 } else { self.num_threads };
        }

        if self.verbose {
            info!(
                "CPU cores: {}, Provider: STT={}, TTS={}, Thread counts: STT={}, TTS={}",
                cpu_cores,
                self.effective_stt_provider(),
                self.effective_tts_provider(),
                self.stt_threads,
                self.tts_threads
            );
        }
    }

    /// Get the effective STT provider.
    pub fn effective_stt_provider(&self) -> Provider {
        self.stt_provider.or(self.provider).unwrap_or_else(detect_provider)
    }

    /// Get the effective TTS provider.
    pub fn effective_tts_provider(&self) -> Provider {
        self.tts_provider.or(self.provider).unwrap_or_else(detect_provider)
    }

    /// The configured locale, if it is in the locale table.
    pub fn voice_locale(&self) -> Option<&'static VoiceLocale> {
        locales::get_locale(&self.locale)
    }

    /// Speaker ID, from the command line or the locale's default.
    pub fn speaker_id(&self, locale: &VoiceLocale) -> i32 {
        self.tts_speaker_id.unwrap_or(locale.speaker_id)
    }

    /// Get the path to the Whisper encoder model (multilingual).
    pub fn whisper_encoder_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-encoder.int8.onnx")
    }

    /// Get the path to the Whisper decoder model (multilingual).
    pub fn whisper_decoder_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-decoder.int8.onnx")
    }

    /// Get the path to the Whisper tokens file (multilingual).
    pub fn whisper_tokens_path(&self) -> PathBuf {
        self.model_dir.join("whisper").join("whisper-small-tokens.txt")
    }

    /// Get the path to the VAD model.
    pub fn vad_model_path(&self) -> PathBuf {
        self.model_dir.join("silero_vad.onnx")
    }

    /// Every file the recognizer needs.
    pub fn stt_model_files(&self) -> [PathBuf; 4] {
        [self.whisper_encoder_path(), self.whisper_decoder_path(), self.whisper_tokens_path(), self.vad_model_path()]
    }

    /// Directory of the selected synthesis engine.
    pub fn tts_dir(&self) -> PathBuf {
        self.model_dir.join("tts").join(&self.tts_engine)
    }

    pub fn tts_model_path(&self) -> PathBuf {
        self.tts_dir().join("model.onnx")
    }

    pub fn tts_voices_path(&self) -> PathBuf {
        self.tts_dir().join("voices.bin")
    }

    pub fn tts_tokens_path(&self) -> PathBuf {
        self.tts_dir().join("tokens.txt")
    }

    /// espeak-ng data directory (holds per-language dictionaries).
    pub fn tts_data_dir(&self) -> PathBuf {
        self.tts_dir().join("espeak-ng-data")
    }

    /// Dict directory (for Chinese segmentation).
    pub fn tts_dict_dir(&self) -> PathBuf {
        self.tts_dir().join("dict")
    }

    /// Every file the synthesis engine needs regardless of locale.
    pub fn tts_model_files(&self) -> [PathBuf; 4] {
        [self.tts_model_path(), self.tts_voices_path(), self.tts_tokens_path(), self.tts_data_dir()]
    }

    /// Comma-separated lexicon paths for locales that use lexicons instead of espeak.
    pub fn tts_lexicon(&self, locale: &VoiceLocale) -> String {
        let tts_dir = self.tts_dir();
        locale.lexicons.iter().map(|name| tts_dir.join(name).to_string_lossy().to_string()).collect::<Vec<_>>().join(",")
    }

    /// Kokoro `lang` parameter: empty for lexicon locales, otherwise the espeak code.
    pub fn tts_language(&self, locale: &VoiceLocale) -> String {
        if locale.lexicons.is_empty() { locale.espeak_code.to_string() } else { String::new() }
    }

    /// Validate the configuration.
    ///
    /// Missing model files are not an error here: a missing synthesis engine
    /// leaves the menu inert and a missing recognizer is reported at turn time.
    pub fn validate(&self) -> Result<()> {
        if self.voice_locale().is_none() {
            anyhow::bail!("Unsupported locale '{}'. Run with --list-locales to see available locales", self.locale);
        }

        if !(0.0..=1.0).contains(&self.vad_threshold) {
            anyhow::bail!("VAD threshold must be between 0.0 and 1.0");
        }

        if self.vad_silence_duration <= 0.0 {
            anyhow::bail!("VAD silence duration must be positive");
        }

        if self.tts_speed <= 0.0 {
            anyhow::bail!("TTS speed must be positive");
        }

        if self.sample_rate == 0 {
            anyhow::bail!("Sample rate must be positive");
        }

        Ok(())
    }

    /// Log the current configuration.
    pub fn log_config(&self) {
        info!("Configuration:");
        info!("  Model directory: {}", self.model_dir.display());
        info!("  Locale: {}", self.locale);
        info!("  TTS engine: {}", self.tts_engine);
        info!("  TTS speed: {}", self.tts_speed);
        if let Some(speaker_id) = self.tts_speaker_id {
            info!("  TTS speaker ID: {}", speaker_id);
        }
        info!("  Sample rate: {} Hz", self.sample_rate);
        info!("  VAD threshold: {}", self.vad_threshold);
        info!("  Listen timeout: {}s", self.listen_timeout);
        info!("  STT provider: {}", self.effective_stt_provider());
        info!("  TTS provider: {}", self.effective_tts_provider());
    }
}

/// Get the default model directory (~/.voice-menu/models).
fn default_model_dir() -> PathBuf {
    if let Some(home_dir) = dirs::home_dir() {
        home_dir.join(".voice-menu").join("models")
    } else {
        PathBuf::from("models")
    }
}

/// Auto-detect the best hardware acceleration provider.
fn detect_provider() -> Provider {
    #[cfg(target_os = "macos")]
    {
        Provider::CoreMl
    }

    #[cfg(target_os = "linux")]
    {
        if has_nvidia_gpu() { Provider::Cuda } else { Provider::Cpu }
    }

    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        Provider::Cpu
    }
}

/// Check if an NVIDIA GPU is available (Linux only).
#[cfg(target_os = "linux")]
fn has_nvidia_gpu() -> bool {
    use std::path::Path;

    // NVIDIA device files, plus the Jetson (Tegra) markers
    let nvidia_paths = ["/dev/nvidia0", "/dev/nvidiactl", "/dev/nvidia-uvm", "/dev/nvhost-ctrl", "/dev/nvhost-ctrl-gpu", "/etc/nv_tegra_release"];

    nvidia_paths.iter().any(|path| Path::new(path).exists())
}

/// Parse a strictly positive number of seconds.
fn parse_positive_secs(s: &str) -> Result<f32, String> {
    let value: f32 = s.parse().map_err(|_| format!("'{}' is not a valid number of seconds", s))?;
    if value > 0.0 && value.is_finite() { Ok(value) } else { Err(format!("duration must be positive, got {}", value)) }
}
