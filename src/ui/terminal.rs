//! Terminal rendition of the single-screen surface.
//!
//! The text region is printed as a framed block; pressing Enter is the trigger.

use std::io::Write;
use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::controller::services::{Directive, Presenter};
use crate::menu;

/// Writes the presentation surface to any `Write` (stdout in production).
pub struct TerminalPresenter<W: Write> {
    out: W,
    model_dir: PathBuf, // Where missing models are expected, for directives
    tts_engine: String,
}

impl TerminalPresenter<std::io::Stdout> {
    pub fn stdout(model_dir: PathBuf, tts_engine: String) -> Self {
        Self::new(std::io::stdout(), model_dir, tts_engine)
    }
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W, model_dir: PathBuf, tts_engine: String) -> Self {
        Self { out, model_dir, tts_engine }
    }

    fn write_block(&mut self, lines: &[String]) {
        let result = (|| -> std::io::Result<()> {
            for line in lines {
                writeln!(self.out, "{}", line)?;
            }
            self.out.flush()
        })();
        if let Err(e) = result {
            debug!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn show_text(&mut self, text: &str) {
        let body = if text.is_empty() { menu::MENU_NOTE } else { text };

        let mut lines = vec![String::new(), "═".repeat(60)];
        lines.extend(body.lines().map(|line| format!("  {}", line.trim())));
        lines.push("═".repeat(60));
        self.write_block(&lines);
    }

    fn set_trigger_enabled(&mut self, enabled: bool) {
        let line = if enabled { "[ Bicara ] press Enter to speak" } else { "[ ...... ] please wait" };
        self.write_block(&[line.to_string()]);
    }

    fn direct(&mut self, directive: Directive) {
        let line = match directive {
            Directive::InstallSynthesisEngine => format!(
                "⚠️  Speech engine '{}' is not installed. Download it into {}",
                self.tts_engine,
                self.model_dir.join("tts").join(&self.tts_engine).display()
            ),
            Directive::InstallVoiceData { locale } => {
                format!("⚠️  Voice data for {} is missing. Reinstall the espeak-ng data of speech engine '{}'", locale, self.tts_engine)
            }
            Directive::InstallRecognizer => {
                format!("⚠️  No speech recognizer found. Install the Whisper and Silero VAD models into {}", self.model_dir.display())
            }
        };
        self.write_block(&[line]);
    }
}

/// Turn each line read from stdin into a trigger press.
///
/// The task ends when stdin closes or the receiver is dropped.
pub fn spawn_trigger_reader(triggers: mpsc::Sender<()>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(_)) => {
                    if triggers.send(()).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    debug!("Failed to read stdin: {}", e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut TerminalPresenter<Vec<u8>>)) -> String {
        let mut presenter = TerminalPresenter::new(Vec::new(), PathBuf::from("/models"), "kokoro".to_string());
        f(&mut presenter);
        String::from_utf8(presenter.out).unwrap()
    }

    #[test]
    fn test_empty_text_shows_menu_note() {
        let out = render(|p| p.show_text(""));
        assert!(out.contains("Silahkan pilih info apa yang ingin kamu ketahui:"));
        assert!(out.contains("  4. Menjaga Kebersihan Organ Reproduksi."));
    }

    #[test]
    fn test_text_replaces_menu_note() {
        let out = render(|p| p.show_text("dua"));
        assert!(out.contains("  dua"));
        assert!(!out.contains("Silahkan pilih"));
    }

    #[test]
    fn test_trigger_state_lines() {
        assert!(render(|p| p.set_trigger_enabled(true)).contains("Bicara"));
        assert!(render(|p| p.set_trigger_enabled(false)).contains("please wait"));
    }

    #[test]
    fn test_recognizer_directive_names_model_dir() {
        let out = render(|p| p.direct(Directive::InstallRecognizer));
        assert!(out.contains("/models"));
    }
}
