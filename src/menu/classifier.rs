//! Keyword classification of recognized transcripts.
//!
//! Matching is plain substring containment against one word and one digit per
//! option, tested in menu order. The first option that matches wins, so a
//! transcript like "12" selects option 1 rather than a "more specific" one.

use std::sync::LazyLock;

use regex::Regex;

use super::script::{FALLBACK_PREFIX, OPTIONS};

/// Everything that is not an ASCII letter, digit or space.
static NON_ALPHANUMERIC: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-zA-Z0-9 ]").expect("static pattern is valid"));

/// One of the four fixed menu options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    /// "Bagian bagian reproduksi."
    Anatomy,
    /// "Pubertas dan Menstruasi."
    Puberty,
    /// "Permasalahan Organ Reproduksi."
    Problems,
    /// "Menjaga Kebersihan Organ Reproduksi."
    Hygiene,
}

impl MenuChoice {
    const ALL: [MenuChoice; 4] = [MenuChoice::Anatomy, MenuChoice::Puberty, MenuChoice::Problems, MenuChoice::Hygiene];

    /// One-based option number as read out in the menu.
    pub fn number(self) -> usize {
        self as usize + 1
    }

    /// Canned response text for this option.
    pub fn response(self) -> &'static str {
        OPTIONS[self as usize].2
    }

    fn matches(self, normalized: &str) -> bool {
        let (word, digit, _) = OPTIONS[self as usize];
        normalized.contains(word) || normalized.contains(digit)
    }
}

/// Result of classifying a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The transcript selected a menu option.
    Choice { choice: MenuChoice, normalized: String },
    /// Nothing matched; the normalized transcript is echoed back.
    Unclassified { normalized: String },
}

impl Classification {
    /// The text to speak for this outcome.
    ///
    /// A matched option echoes what was heard before the answer; unmatched
    /// input is read back after a fixed prefix.
    pub fn spoken_text(&self) -> String {
        match self {
            Classification::Choice { choice, normalized } => format!("{}, {}", normalized, choice.response()),
            Classification::Unclassified { normalized } => format!("{} {}", FALLBACK_PREFIX, normalized),
        }
    }

    /// The normalized transcript this classification was made from.
    pub fn normalized(&self) -> &str {
        match self {
            Classification::Choice { normalized, .. } | Classification::Unclassified { normalized } => normalized,
        }
    }
}

/// Strip non-alphanumeric characters, trim, and lower-case.
pub fn normalize(transcript: &str) -> String {
    NON_ALPHANUMERIC.replace_all(transcript, "").trim().to_lowercase()
}

/// Classify a raw transcript against the menu options.
pub fn classify(transcript: &str) -> Classification {
    let normalized = normalize(transcript);

    match MenuChoice::ALL.into_iter().find(|choice| choice.matches(&normalized)) {
        Some(choice) => Classification::Choice { choice, normalized },
        None => Classification::Unclassified { normalized },
    }
}
