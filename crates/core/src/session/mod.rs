#![allow(missing_docs)]

//! Game sessions: per-room state and the process-wide registry.

mod game;
mod models;
pub mod registry;

pub use game::{GameSession, MAX_PLAYERS, MIN_PLAYERS};
pub use models::{MoveResult, Phase, Player};
pub use registry::{SessionRegistry, TurnReport};
