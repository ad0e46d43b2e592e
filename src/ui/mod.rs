//! Terminal presentation: the text region, the trigger, and directives.

mod terminal;

pub use terminal::{TerminalPresenter, spawn_trigger_reader};
