//! Menu script constants (Indonesian).

/// Spoken once when the synthesis engine becomes ready.
pub const GREETING: &str = "Kenali organ reproduksimu. Silahkan tekan button di tengah untuk memulai.";

/// Shown while the text region is empty, and spoken at the start of every turn.
pub const MENU_NOTE: &str = "Silahkan pilih info apa yang ingin kamu ketahui:\n\
1. Bagian bagian reproduksi.\n 2. Pubertas dan Menstruasi.\n 3. Permasalahan Organ Reproduksi.\n 4. Menjaga Kebersihan Organ Reproduksi.\n Silahkan berbicara sekarang";

/// Prompt handed to the recognizer with every request.
pub const RECOGNITION_PROMPT: &str = "Silahkan sebutkan nomor pilihan anda.";

/// Spoken when no recognizer is available.
pub const NOT_DETECTED: &str = "tidak terdeteksi";

/// Displayed when a recognition request fails.
pub const FAILURE_TEXT: &str = "[Speech recognition failed.]";

/// Displayed (and classified) when recognition succeeds with an empty transcript.
pub const EMPTY_RESULT_TEXT: &str = "No speech detected.";

/// Prefix of the echo spoken for input that matches no option.
pub(crate) const FALLBACK_PREFIX: &str = "input is";

/// Menu entries in priority order: (word, digit, response).
pub(crate) const OPTIONS: [(&str, &str, &str); 4] = [
    ("satu", "1", "Bagian bagian reproduksi."),
    ("dua", "2", "Pubertas dan Menstruasi."),
    ("tiga", "3", "Permasalahan Organ Reproduksi."),
    ("empat", "4", "Menjaga Kebersihan Organ Reproduksi."),
];
