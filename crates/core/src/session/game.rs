use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    board::{Board, FINAL_SQUARE},
    dice::DiceSource,
    error::GameError,
};

use super::models::{MoveResult, Phase, Player};

/// Seat capacity of a session.
pub const MAX_PLAYERS: usize = 4;
/// Players required before a game may start.
pub const MIN_PLAYERS: usize = 2;

/// Roster, turn order and win state for one room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSession {
    id: String,
    players: Vec<Player>,
    current: usize,
    round: u32,
    phase: Phase,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl GameSession {
    /// Fresh lobby for `id`. Uniqueness per id is the registry's concern.
    pub fn new(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            players: Vec::new(),
            current: 0,
            round: 1,
            phase: Phase::Lobby,
            created_at: now,
            last_activity: now,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Turn counter shown to players. Starts at 1 and grows with every
    /// individual turn, not with every full pass around the table.
    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    /// Player whose turn it is, if anyone is seated.
    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|player| player.id == player_id)
    }

    pub fn has_joined(&self, player_id: &str) -> bool {
        self.player(player_id).is_some()
    }

    /// Seat a new player at the end of the turn order.
    pub fn add_player(
        &mut self,
        player_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Player, GameError> {
        match self.phase {
            Phase::Lobby => {}
            Phase::InProgress => return Err(GameError::AlreadyInProgress),
            Phase::Finished => return Err(GameError::GameOver),
        }
        let player_id = player_id.into();
        if self.has_joined(&player_id) {
            return Err(GameError::AlreadyJoined);
        }
        if self.is_full() {
            return Err(GameError::SessionFull { max: MAX_PLAYERS });
        }

        let player = Player::new(player_id, name.into(), self.players.len() + 1);
        self.players.push(player.clone());
        self.touch();
        Ok(player)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    pub fn can_start(&self) -> bool {
        self.phase == Phase::Lobby && self.players.len() >= MIN_PLAYERS
    }

    /// Leave the lobby and hand the first turn to seat 1.
    pub fn start(&mut self) -> Result<(), GameError> {
        match self.phase {
            Phase::Lobby => {}
            Phase::InProgress => return Err(GameError::AlreadyInProgress),
            Phase::Finished => return Err(GameError::GameOver),
        }
        if self.players.len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers {
                min: MIN_PLAYERS,
                have: self.players.len(),
            });
        }
        self.phase = Phase::InProgress;
        self.current = 0;
        self.touch();
        Ok(())
    }

    pub fn is_players_turn(&self, player_id: &str) -> bool {
        self.current_player()
            .map(|player| player.id == player_id)
            .unwrap_or(false)
    }

    pub fn has_winner(&self) -> bool {
        self.winner().is_some()
    }

    pub fn winner(&self) -> Option<&Player> {
        self.players
            .iter()
            .find(|player| player.position == FINAL_SQUARE)
    }

    /// Roll for `player_id` and move them. The turn is not handed on; call
    /// [`GameSession::advance_turn`] once the result has been shown and
    /// [`GameSession::has_winner`] is false.
    pub fn take_turn(
        &mut self,
        board: &Board,
        player_id: &str,
        dice: &mut dyn DiceSource,
    ) -> Result<MoveResult, GameError> {
        self.ensure_in_progress()?;
        if !self.is_players_turn(player_id) {
            return Err(GameError::NotYourTurn);
        }

        let roll = dice.roll();
        let player = &mut self.players[self.current];
        let from = player.position;
        let (to, outcome) = board.resolve_move(from, roll);
        player.position = to;

        let result = MoveResult {
            player_name: player.name.clone(),
            seat: player.seat,
            roll,
            outcome,
            from,
            to,
        };
        debug!(session = %self.id, seat = result.seat, roll, from, to, ?outcome, "Turn resolved");

        if to == FINAL_SQUARE {
            self.phase = Phase::Finished;
        }
        self.touch();
        Ok(result)
    }

    /// Hand the turn to the next seat and bump the round counter.
    pub fn advance_turn(&mut self) -> Result<(), GameError> {
        self.ensure_in_progress()?;
        self.current = (self.current + 1) % self.players.len();
        self.round += 1;
        self.touch();
        Ok(())
    }

    /// Force the terminal phase, e.g. when the room is aborted.
    pub fn finish(&mut self) {
        self.phase = Phase::Finished;
        self.touch();
    }

    /// `(seat, position)` for every player, in seat order.
    pub fn markers(&self) -> Vec<(usize, u8)> {
        self.players
            .iter()
            .map(|player| (player.seat, player.position))
            .collect()
    }

    fn ensure_in_progress(&self) -> Result<(), GameError> {
        match self.phase {
            Phase::InProgress => Ok(()),
            Phase::Lobby => Err(GameError::NotStarted),
            Phase::Finished => Err(GameError::GameOver),
        }
    }

    fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{board::Outcome, dice::ScriptedDice};

    fn lobby_with(names: &[&str]) -> GameSession {
        let mut session = GameSession::new("room");
        for name in names {
            session
                .add_player(name.to_lowercase(), *name)
                .expect("join should succeed");
        }
        session
    }

    fn started_with(names: &[&str]) -> GameSession {
        let mut session = lobby_with(names);
        session.start().expect("start should succeed");
        session
    }

    #[test]
    fn players_are_seated_in_join_order() {
        let session = lobby_with(&["Ann", "Bob", "Cid"]);
        let seats: Vec<_> = session
            .players()
            .iter()
            .map(|p| (p.name.as_str(), p.seat, p.position))
            .collect();
        assert_eq!(seats, vec![("Ann", 1, 0), ("Bob", 2, 0), ("Cid", 3, 0)]);
        assert_eq!(session.phase(), Phase::Lobby);
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn duplicate_join_is_rejected() {
        let mut session = lobby_with(&["Ann"]);
        let err = session.add_player("ann", "Ann again").unwrap_err();
        assert!(matches!(err, GameError::AlreadyJoined));
        assert_eq!(session.players().len(), 1);
    }

    #[test]
    fn fifth_player_does_not_fit() {
        let mut session = lobby_with(&["Ann", "Bob", "Cid", "Dee"]);
        let before = session.players().to_vec();
        let err = session.add_player("eve", "Eve").unwrap_err();
        assert!(matches!(err, GameError::SessionFull { max: MAX_PLAYERS }));
        assert_eq!(session.players(), before.as_slice());
    }

    #[test]
    fn start_needs_two_players() {
        let mut session = lobby_with(&["Ann"]);
        let err = session.start().unwrap_err();
        assert!(matches!(
            err,
            GameError::NotEnoughPlayers { min: 2, have: 1 }
        ));
        assert_eq!(session.phase(), Phase::Lobby);

        session.add_player("bob", "Bob").unwrap();
        assert!(session.can_start());
        session.start().unwrap();
        assert_eq!(session.phase(), Phase::InProgress);
        assert!(matches!(
            session.add_player("cid", "Cid"),
            Err(GameError::AlreadyInProgress)
        ));
    }

    #[test]
    fn turn_order_is_cyclic() {
        let mut session = started_with(&["A", "B", "C"]);
        assert!(session.is_players_turn("a"));
        for _ in 0..4 {
            session.advance_turn().unwrap();
        }
        assert_eq!(session.current_index(), 1);
        assert!(session.is_players_turn("b"));
        assert!(!session.is_players_turn("a"));
        assert_eq!(session.round(), 5);
    }

    #[test]
    fn take_turn_moves_only_the_current_player() {
        let mut session = started_with(&["Ann", "Bob"]);
        let mut dice = ScriptedDice::new(vec![1]);
        let result = session
            .take_turn(Board::standard(), "ann", &mut dice)
            .unwrap();
        assert_eq!(result.outcome, Outcome::LadderClimb);
        assert_eq!((result.from, result.to), (0, 38));
        assert_eq!(session.players()[0].position, 38);
        assert_eq!(session.players()[1].position, 0);
        // turn is not handed on automatically
        assert!(session.is_players_turn("ann"));
        assert_eq!(session.round(), 1);
    }

    #[test]
    fn out_of_turn_roll_is_rejected_without_rolling() {
        let mut session = started_with(&["Ann", "Bob"]);
        let mut dice = ScriptedDice::new(vec![4, 2]);
        let err = session
            .take_turn(Board::standard(), "bob", &mut dice)
            .unwrap_err();
        assert!(matches!(err, GameError::NotYourTurn));
        assert!(session.players().iter().all(|p| p.position == 0));

        let result = session
            .take_turn(Board::standard(), "ann", &mut dice)
            .unwrap();
        assert_eq!(result.roll, 4);
    }

    #[test]
    fn turns_are_refused_in_the_lobby() {
        let mut session = lobby_with(&["Ann", "Bob"]);
        let mut dice = ScriptedDice::new(vec![3]);
        assert!(matches!(
            session.take_turn(Board::standard(), "ann", &mut dice),
            Err(GameError::NotStarted)
        ));
        assert!(matches!(session.advance_turn(), Err(GameError::NotStarted)));
    }

    #[test]
    fn reaching_the_final_square_finishes_the_game() {
        let board = Board::from_jumps(Vec::<(u8, u8)>::new()).unwrap();
        let mut session = started_with(&["Ann", "Bob"]);
        let mut dice = ScriptedDice::new(vec![6]);
        // 16 rolls of six put Ann on 96; Bob shadows her
        for _ in 0..16 {
            session.take_turn(&board, "ann", &mut dice).unwrap();
            session.advance_turn().unwrap();
            session.take_turn(&board, "bob", &mut dice).unwrap();
            session.advance_turn().unwrap();
        }
        assert_eq!(session.players()[0].position, 96);

        let mut four = ScriptedDice::new(vec![4]);
        let result = session.take_turn(&board, "ann", &mut four).unwrap();
        assert_eq!(result.to, FINAL_SQUARE);
        assert!(session.has_winner());
        assert_eq!(session.winner().map(|p| p.name.as_str()), Some("Ann"));
        assert_eq!(session.phase(), Phase::Finished);
        assert!(matches!(session.advance_turn(), Err(GameError::GameOver)));
        assert!(matches!(
            session.take_turn(&board, "ann", &mut four),
            Err(GameError::GameOver)
        ));
    }

    #[test]
    fn move_descriptions_read_naturally() {
        let base = MoveResult {
            player_name: "Ann".to_string(),
            seat: 1,
            roll: 1,
            outcome: Outcome::SnakeSlide,
            from: 94,
            to: 56,
        };
        assert_eq!(
            base.to_string(),
            "Ann rolled a 1.\nAnn slid down a snake at 95 to 56!"
        );

        let ladder = MoveResult {
            outcome: Outcome::LadderClimb,
            from: 7,
            to: 30,
            ..base.clone()
        };
        assert_eq!(
            ladder.to_string(),
            "Ann rolled a 1.\nAnn climbed a ladder at 8 to 30!"
        );

        let stuck = MoveResult {
            roll: 6,
            outcome: Outcome::NoMove,
            from: 98,
            to: 98,
            ..base.clone()
        };
        assert_eq!(stuck.to_string(), "Ann rolled a 6.\nAnn doesn't move.");

        let plain = MoveResult {
            roll: 3,
            outcome: Outcome::PlainMove,
            from: 2,
            to: 5,
            ..base
        };
        assert_eq!(plain.to_string(), "Ann rolled a 3.\nAnn moved to 5.");
    }
}
