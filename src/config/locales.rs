//! Supported voice locales.
//!
//! Each locale maps a BCP-47 tag to what the speech stack needs: the espeak-ng
//! language Kokoro phonemizes with (or the lexicon files it reads instead), the
//! Whisper language code, and a default Kokoro speaker.

/// Runtime data for one voice locale.
#[derive(Debug, Clone, Copy)]
pub struct VoiceLocale {
    pub espeak_code: &'static str,      // espeak-ng voice for phonemization
    pub espeak_dict: &'static str,      // Dictionary file inside espeak-ng-data
    pub lexicons: &'static [&'static str], // Kokoro lexicon files (replace espeak for these locales)
    pub whisper_language: &'static str, // Whisper language code
    pub speaker_id: i32,                // Default Kokoro speaker
    pub language: &'static str,         // Human-readable name
}

/// All locales, sorted by tag for binary search.
const LOCALES: &[(&str, VoiceLocale)] = &[
    (
        "en-GB",
        VoiceLocale {
            espeak_code: "en-gb",
            espeak_dict: "en_dict",
            lexicons: &["lexicon-gb-en.txt"],
            whisper_language: "en",
            speaker_id: 21,
            language: "British English",
        },
    ),
    (
        "en-US",
        VoiceLocale {
            espeak_code: "en-us",
            espeak_dict: "en_dict",
            lexicons: &["lexicon-us-en.txt"],
            whisper_language: "en",
            speaker_id: 3,
            language: "American English",
        },
    ),
    (
        "es-ES",
        VoiceLocale { espeak_code: "es", espeak_dict: "es_dict", lexicons: &[], whisper_language: "es", speaker_id: 28, language: "Spanish" },
    ),
    (
        "fr-FR",
        VoiceLocale { espeak_code: "fr-fr", espeak_dict: "fr_dict", lexicons: &[], whisper_language: "fr", speaker_id: 30, language: "French" },
    ),
    (
        "hi-IN",
        VoiceLocale { espeak_code: "hi", espeak_dict: "hi_dict", lexicons: &[], whisper_language: "hi", speaker_id: 31, language: "Hindi" },
    ),
    (
        "id-ID",
        VoiceLocale { espeak_code: "id", espeak_dict: "id_dict", lexicons: &[], whisper_language: "id", speaker_id: 3, language: "Indonesian" },
    ),
    (
        "it-IT",
        VoiceLocale { espeak_code: "it", espeak_dict: "it_dict", lexicons: &[], whisper_language: "it", speaker_id: 35, language: "Italian" },
    ),
    (
        "ja-JP",
        VoiceLocale { espeak_code: "ja", espeak_dict: "ja_dict", lexicons: &[], whisper_language: "ja", speaker_id: 37, language: "Japanese" },
    ),
    (
        "pt-BR",
        VoiceLocale { espeak_code: "pt-br", espeak_dict: "pt_dict", lexicons: &[], whisper_language: "pt", speaker_id: 42, language: "Portuguese BR" },
    ),
    (
        "zh-CN",
        VoiceLocale {
            espeak_code: "cmn",
            espeak_dict: "cmn_dict",
            lexicons: &["lexicon-us-en.txt", "lexicon-zh.txt"],
            whisper_language: "zh",
            speaker_id: 47,
            language: "Mandarin Chinese",
        },
    ),
];

/// Look up a locale by tag. Accepts `_` as separator and any letter case.
pub fn get_locale(tag: &str) -> Option<&'static VoiceLocale> {
    let canonical = canonical_tag(tag);
    LOCALES.binary_search_by_key(&canonical.as_str(), |(t, _)| t).ok().map(|idx| &LOCALES[idx].1)
}

/// Whisper language for a locale tag, falling back to the primary subtag.
pub fn whisper_language(tag: &str) -> String {
    match get_locale(tag) {
        Some(locale) => locale.whisper_language.to_string(),
        None => tag.split(['-', '_']).next().unwrap_or_default().to_ascii_lowercase(),
    }
}

/// "id_id" → "id-ID".
fn canonical_tag(tag: &str) -> String {
    let mut parts = tag.trim().split(['-', '_']);
    let language = parts.next().unwrap_or_default().to_ascii_lowercase();
    match parts.next() {
        Some(region) => format!("{}-{}", language, region.to_ascii_uppercase()),
        None => language,
    }
}

/// Print all supported locales.
pub fn print_locales() {
    println!("═══════════════════════════════════════════════════════════════════");
    println!("  Supported voice locales ({})", LOCALES.len());
    println!("═══════════════════════════════════════════════════════════════════");
    println!();
    println!("{:<8} {:<20} {:<8} {:<8} SPEAKER", "LOCALE", "LANGUAGE", "ESPEAK", "WHISPER");
    println!("{}", "─".repeat(60));

    for (tag, locale) in LOCALES {
        println!("{:<8} {:<20} {:<8} {:<8} {}", tag, locale.language, locale.espeak_code, locale.whisper_language, locale.speaker_id);
    }

    println!();
    println!("Default: id-ID (Indonesian)");
    println!();
    println!("Usage:");
    println!("  ./voice-menu --locale id-ID");
    println!("  ./voice-menu --locale en-US --tts-speaker-id 2");
}

/// Print detailed information about one locale.
pub fn print_locale_info(tag: &str) -> anyhow::Result<()> {
    let locale = get_locale(tag).ok_or_else(|| anyhow::anyhow!("Locale '{}' not supported. Run with --list-locales to see available locales", tag))?;

    println!();
    println!("Locale: {}", canonical_tag(tag));
    println!("{}", "─".repeat(40));
    println!("Language:      {}", locale.language);
    println!("espeak code:   {}", locale.espeak_code);
    println!("espeak dict:   {}", locale.espeak_dict);
    if !locale.lexicons.is_empty() {
        println!("Lexicons:      {}", locale.lexicons.join(", "));
    }
    println!("Whisper:       {}", locale.whisper_language);
    println!("Speaker ID:    {}", locale.speaker_id);
    println!();

    Ok(())
}
