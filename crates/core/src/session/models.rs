#![allow(missing_docs)]

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::Outcome;

/// Lifecycle of a session. `Finished` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Accepting joins.
    Lobby,
    /// Players are taking turns.
    InProgress,
    /// Someone reached the final square.
    Finished,
}

impl Phase {
    /// Short label for status lines and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lobby => "lobby",
            Self::InProgress => "in progress",
            Self::Finished => "finished",
        }
    }
}

/// A seated player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Stable external identity, unique within the session.
    pub id: String,
    /// Name shown in move descriptions.
    pub name: String,
    /// 1-based join order; selects the board marker.
    pub seat: usize,
    /// Current square, 0 before the first move.
    pub position: u8,
}

impl Player {
    pub(crate) fn new(id: String, name: String, seat: usize) -> Self {
        Self {
            id,
            name,
            seat,
            position: 0,
        }
    }
}

/// Result of one resolved turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub player_name: String,
    pub seat: usize,
    pub roll: u8,
    pub outcome: Outcome,
    pub from: u8,
    pub to: u8,
}

impl MoveResult {
    /// Square the roll pointed at before any redirect.
    pub fn target(&self) -> u8 {
        self.from.saturating_add(self.roll)
    }
}

impl fmt::Display for MoveResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = &self.player_name;
        writeln!(f, "{name} rolled a {}.", self.roll)?;
        match self.outcome {
            Outcome::NoMove => write!(f, "{name} doesn't move."),
            Outcome::PlainMove => write!(f, "{name} moved to {}.", self.to),
            Outcome::SnakeSlide => write!(
                f,
                "{name} slid down a snake at {} to {}!",
                self.target(),
                self.to
            ),
            Outcome::LadderClimb => write!(
                f,
                "{name} climbed a ladder at {} to {}!",
                self.target(),
                self.to
            ),
        }
    }
}
