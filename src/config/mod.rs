//! Configuration module for the voice menu.
//!
//! Provides CLI argument parsing, configuration management, and the table of
//! supported voice locales.

#[allow(clippy::module_inception)]
mod config;
mod locales;

pub use config::{AppConfig, Provider};
pub use locales::{VoiceLocale, get_locale, whisper_language};
