//! Turn controller and the service contracts it depends on.

pub mod services;
#[cfg(test)]
pub(crate) mod testing;
mod turn;

pub use turn::{TurnController, TurnPhase};
