//! Voice Menu - a spoken menu driven entirely by voice.
//!
//! The program reads a fixed menu aloud, listens for the user's choice with
//! voice activity detection (Silero VAD) and speech recognition (Whisper),
//! and answers with the matching topic using text-to-speech (Kokoro).

mod audio;
mod config;
mod controller;
mod error;
mod menu;
mod session;
mod stt;
mod tts;
mod ui;

use anyhow::Result;
use tokio::signal;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::LocalTime;

use config::AppConfig;
use controller::TurnController;
use session::SessionChannels;
use stt::{ListeningService, Recognizer};
use tts::SpeechEngine;
use ui::TerminalPresenter;

/// Wait for shutdown signal (Ctrl+C or SIGTERM), then cancel `shutdown`.
async fn wait_for_shutdown(shutdown: CancellationToken) {
    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("🛑 Received Ctrl+C, shutting down...");
        }
        _ = terminate() => {
            info!("🛑 Received SIGTERM, shutting down...");
        }
    }

    shutdown.cancel();
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let config = AppConfig::from_args();

    // Respect RUST_LOG env var, fallback to verbose flag, default to info
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(if config.verbose { "debug" } else { "info" }))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(LocalTime::new(time::macros::format_description!("[hour]:[minute]:[second]")))
        .init();

    info!("🎤 Voice Menu v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("❌ Configuration error: {}", e);
        std::process::exit(1);
    }
    config.log_config();

    let (speech_tx, speech_events) = mpsc::unbounded_channel();
    let (recognition_tx, recognition) = mpsc::unbounded_channel();
    let (trigger_tx, triggers) = mpsc::channel::<()>(4);

    // Synthesis initializes on its own thread and reports back as an event
    let output = SpeechEngine::spawn(&config, speech_tx);
    let input = ListeningService::new(Recognizer::new(&config), recognition_tx);
    let presenter = TerminalPresenter::stdout(config.model_dir.clone(), config.tts_engine.clone());
    let controller = TurnController::new(output, input, presenter, config.locale.clone());

    let shutdown = CancellationToken::new();
    let trigger_handle = ui::spawn_trigger_reader(trigger_tx);
    let signal_handle = tokio::spawn(wait_for_shutdown(shutdown.clone()));

    info!("Starting voice menu...");
    let controller = session::run(controller, SessionChannels { triggers, speech_events, recognition }, shutdown).await;
    debug!("Final turn phase: {:?}", controller.state().phase());

    // stdin reads cannot be cancelled; the runtime drops the task on exit
    trigger_handle.abort();
    signal_handle.abort();

    info!("✅ Voice menu stopped");
    Ok(())
}
