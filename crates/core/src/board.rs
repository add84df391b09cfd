//! Static board table and move resolution.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::BoardError;

/// Final square; landing on it exactly wins the game.
pub const FINAL_SQUARE: u8 = 100;
const SQUARE_COUNT: usize = FINAL_SQUARE as usize + 1;

/// Snakes and ladders of the classic board, as `(square, redirect)`.
const STANDARD_JUMPS: [(u8, u8); 14] = [
    (1, 38),
    (4, 14),
    (8, 30),
    (21, 42),
    (28, 76),
    (32, 10),
    (36, 6),
    (48, 26),
    (50, 67),
    (62, 18),
    (71, 92),
    (80, 99),
    (95, 56),
    (97, 78),
];

static STANDARD_BOARD: Lazy<Board> = Lazy::new(|| {
    Board::from_jumps(STANDARD_JUMPS).expect("invalid standard board table")
});

/// What happened when a roll was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Overshot the final square; the player stays put.
    NoMove,
    /// Landed on a square without a redirect.
    PlainMove,
    /// Landed on a snake head and slid down.
    SnakeSlide,
    /// Landed on a ladder foot and climbed up.
    LadderClimb,
}

/// A snake or ladder endpoint pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jump {
    /// Square the player lands on.
    pub from: u8,
    /// Square the player ends up on.
    pub to: u8,
}

impl Jump {
    /// True when the redirect leads down the board.
    pub fn is_snake(&self) -> bool {
        self.to < self.from
    }

    /// True when the redirect leads up the board.
    pub fn is_ladder(&self) -> bool {
        self.to > self.from
    }
}

/// Immutable 101-square lookup table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    squares: [Option<u8>; SQUARE_COUNT],
}

impl Board {
    /// Shared classic board.
    pub fn standard() -> &'static Board {
        &STANDARD_BOARD
    }

    /// Build a board from `(square, redirect)` pairs.
    pub fn from_jumps(jumps: impl IntoIterator<Item = (u8, u8)>) -> Result<Self, BoardError> {
        let mut squares = [None; SQUARE_COUNT];
        for (from, to) in jumps {
            if from > FINAL_SQUARE {
                return Err(BoardError::OutOfRange(from));
            }
            if to > FINAL_SQUARE {
                return Err(BoardError::OutOfRange(to));
            }
            if from == to {
                return Err(BoardError::SelfRedirect(from));
            }
            let slot = &mut squares[usize::from(from)];
            if slot.is_some() {
                return Err(BoardError::Duplicate(from));
            }
            *slot = Some(to);
        }
        Ok(Self { squares })
    }

    /// Redirect target for `square`, if it holds a snake head or ladder foot.
    pub fn redirect(&self, square: u8) -> Option<u8> {
        self.squares.get(usize::from(square)).copied().flatten()
    }

    /// All redirects in ascending square order.
    pub fn jumps(&self) -> impl Iterator<Item = Jump> + '_ {
        self.squares
            .iter()
            .enumerate()
            .filter_map(|(from, to)| to.map(|to| Jump { from: from as u8, to }))
    }

    /// Redirects leading down the board.
    pub fn snakes(&self) -> impl Iterator<Item = Jump> + '_ {
        self.jumps().filter(Jump::is_snake)
    }

    /// Redirects leading up the board.
    pub fn ladders(&self) -> impl Iterator<Item = Jump> + '_ {
        self.jumps().filter(Jump::is_ladder)
    }

    /// Resolve a roll from `position`. Inputs are trusted: `position` is
    /// within the board and `roll` came from a die.
    pub fn resolve_move(&self, position: u8, roll: u8) -> (u8, Outcome) {
        let target = position.saturating_add(roll);
        if target > FINAL_SQUARE {
            return (position, Outcome::NoMove);
        }
        match self.redirect(target) {
            None => (target, Outcome::PlainMove),
            Some(to) if to < target => (to, Outcome::SnakeSlide),
            Some(to) => (to, Outcome::LadderClimb),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_matches_classic_layout() {
        let board = Board::standard();
        assert_eq!(board.jumps().count(), STANDARD_JUMPS.len());
        assert_eq!(board.redirect(8), Some(30));
        assert_eq!(board.redirect(95), Some(56));
        assert_eq!(board.redirect(0), None);
        assert_eq!(board.redirect(100), None);
        assert_eq!(board.snakes().count(), 6);
        assert_eq!(board.ladders().count(), 8);
    }

    #[test]
    fn overshoot_stays_put() {
        let board = Board::standard();
        assert_eq!(board.resolve_move(98, 6), (98, Outcome::NoMove));
        assert_eq!(board.resolve_move(99, 2), (99, Outcome::NoMove));
    }

    #[test]
    fn exact_landing_on_final_square() {
        assert_eq!(
            Board::standard().resolve_move(94, 6),
            (100, Outcome::PlainMove)
        );
    }

    #[test]
    fn snakes_and_ladders_redirect() {
        let board = Board::standard();
        assert_eq!(board.resolve_move(94, 1), (56, Outcome::SnakeSlide));
        assert_eq!(board.resolve_move(7, 1), (30, Outcome::LadderClimb));
        assert_eq!(board.resolve_move(0, 1), (38, Outcome::LadderClimb));
        assert_eq!(board.resolve_move(26, 2), (76, Outcome::LadderClimb));
        assert_eq!(board.resolve_move(2, 3), (5, Outcome::PlainMove));
    }

    #[test]
    fn resolution_is_pure() {
        let board = Board::standard();
        for position in 0..=FINAL_SQUARE {
            for roll in 1..=6 {
                let first = board.resolve_move(position, roll);
                assert_eq!(first, board.resolve_move(position, roll));
                assert!(first.0 <= FINAL_SQUARE);
            }
        }
    }

    #[test]
    fn rejects_malformed_tables() {
        assert_eq!(
            Board::from_jumps([(5, 5)]),
            Err(BoardError::SelfRedirect(5))
        );
        assert_eq!(
            Board::from_jumps([(5, 101)]),
            Err(BoardError::OutOfRange(101))
        );
        assert_eq!(
            Board::from_jumps([(5, 9), (5, 2)]),
            Err(BoardError::Duplicate(5))
        );
    }
}
