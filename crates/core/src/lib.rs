#![warn(clippy::all, missing_docs)]

//! Core game logic for Snakes & Ladders.
//!
//! This crate hosts the board table and move resolution, injectable
//! dice, the per-room session state machine, the shared session
//! registry, board layout rendering and configuration used by the
//! terminal UI and any future frontends.

pub mod board;
pub mod config;
pub mod dice;
pub mod error;
pub mod render;
pub mod session;

pub use board::{Board, Jump, Outcome, FINAL_SQUARE};
pub use config::AppConfig;
pub use dice::{DiceSource, RandomDice, ScriptedDice};
pub use error::{BoardError, GameError};
pub use render::{ArtifactRef, BoardGeometry, BoardRenderer, LayoutRenderer};
pub use session::{
    GameSession, MoveResult, Phase, Player, SessionRegistry, TurnReport, MAX_PLAYERS, MIN_PLAYERS,
};
