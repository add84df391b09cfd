//! Error taxonomy surfaced to front-ends.

use thiserror::Error;

/// Recoverable game failures. Each variant carries a user-facing message.
#[derive(Debug, Error)]
pub enum GameError {
    /// A session (or its board artifact) already exists for this id.
    #[error("a game is already running here; finish the current game first")]
    AlreadyStarted,
    /// The player is already seated in the session.
    #[error("you have already joined")]
    AlreadyJoined,
    /// The roster is at capacity.
    #[error("the game is full ({max} players)")]
    SessionFull {
        /// Seat capacity of the session.
        max: usize,
    },
    /// Someone other than the current player tried to roll.
    #[error("it's not your turn")]
    NotYourTurn,
    /// Start requested with fewer than two players.
    #[error("at least {min} players are needed to start (have {have})")]
    NotEnoughPlayers {
        /// Minimum roster size.
        min: usize,
        /// Players currently seated.
        have: usize,
    },
    /// Turn operation attempted while still in the lobby.
    #[error("the game has not started yet")]
    NotStarted,
    /// Lobby operation attempted after the game started.
    #[error("the game is already in progress")]
    AlreadyInProgress,
    /// Any mutation after a player reached the final square.
    #[error("the game is over")]
    GameOver,
    /// No live session under the given id.
    #[error("no game found for session {0}")]
    UnknownSession(String),
    /// Board artifact could not be written or removed.
    #[error("failed to render board: {0:#}")]
    Render(anyhow::Error),
}

/// Invalid board table construction.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BoardError {
    /// Square index outside the board.
    #[error("square {0} is outside the board")]
    OutOfRange(u8),
    /// A redirect pointing back at its own square.
    #[error("square {0} redirects to itself")]
    SelfRedirect(u8),
    /// The same square configured twice.
    #[error("square {0} has more than one redirect")]
    Duplicate(u8),
}
