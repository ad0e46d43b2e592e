//! The fixed menu script and the keyword classifier for spoken choices.

mod classifier;
mod script;

pub use classifier::{Classification, classify};
pub use script::{EMPTY_RESULT_TEXT, FAILURE_TEXT, GREETING, MENU_NOTE, NOT_DETECTED, RECOGNITION_PROMPT};
