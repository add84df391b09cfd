use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::{info, warn};

use crate::{
    board::Board,
    dice::DiceSource,
    error::GameError,
    render::{ArtifactRef, BoardRenderer},
};

use super::{
    game::GameSession,
    models::{MoveResult, Player},
};

/// Outcome of [`SessionRegistry::take_turn`]: the move plus the refreshed board.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub result: MoveResult,
    /// Redrawn board; `None` when the redraw failed. The move stands either way.
    pub artifact: Option<ArtifactRef>,
    /// True when this move won the game.
    pub finished: bool,
}

/// Thread-safe map of live sessions keyed by room id. At most one session
/// exists per id; each session owns the board artifact of the same id.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<Inner>>,
}

struct Inner {
    sessions: HashMap<String, GameSession>,
    board: Board,
    dice: Box<dyn DiceSource>,
    renderer: Box<dyn BoardRenderer>,
    ttl: Duration,
}

impl SessionRegistry {
    /// Registry on the classic board.
    pub fn new(
        renderer: impl BoardRenderer + 'static,
        dice: impl DiceSource + 'static,
        ttl: Duration,
    ) -> Self {
        Self::with_board(Board::standard().clone(), renderer, dice, ttl)
    }

    pub fn with_board(
        board: Board,
        renderer: impl BoardRenderer + 'static,
        dice: impl DiceSource + 'static,
        ttl: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                sessions: HashMap::new(),
                board,
                dice: Box::new(dice),
                renderer: Box::new(renderer),
                ttl,
            })),
        }
    }

    /// Board the sessions are played on.
    pub fn board(&self) -> Board {
        self.inner.read().board.clone()
    }

    /// Open a lobby for `session_id` and draw the empty board.
    pub fn create(&self, session_id: &str) -> Result<ArtifactRef, GameError> {
        let mut inner = self.inner.write();
        if inner.sessions.contains_key(session_id) || inner.renderer.exists(session_id) {
            return Err(GameError::AlreadyStarted);
        }
        let artifact = inner
            .renderer
            .render(session_id, &[])
            .map_err(GameError::Render)?;
        inner
            .sessions
            .insert(session_id.to_string(), GameSession::new(session_id));
        info!(session = session_id, "Session created");
        Ok(artifact)
    }

    pub fn join(
        &self,
        session_id: &str,
        player_id: &str,
        name: &str,
    ) -> Result<Player, GameError> {
        let mut inner = self.inner.write();
        let session = inner.session_mut(session_id)?;
        let player = session.add_player(player_id, name)?;
        info!(session = session_id, seat = player.seat, name = %player.name, "Player joined");
        Ok(player)
    }

    pub fn start(&self, session_id: &str) -> Result<(), GameError> {
        let mut inner = self.inner.write();
        let session = inner.session_mut(session_id)?;
        session.start()?;
        info!(session = session_id, players = session.players().len(), "Game started");
        Ok(())
    }

    pub fn is_players_turn(&self, session_id: &str, player_id: &str) -> bool {
        self.inner
            .read()
            .sessions
            .get(session_id)
            .map(|session| session.is_players_turn(player_id))
            .unwrap_or(false)
    }

    /// Roll for `player_id`, move them and redraw the board. Turn ownership
    /// is checked under the write lock, before anything changes.
    pub fn take_turn(&self, session_id: &str, player_id: &str) -> Result<TurnReport, GameError> {
        let mut guard = self.inner.write();
        let Inner {
            sessions,
            board,
            dice,
            renderer,
            ..
        } = &mut *guard;
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| GameError::UnknownSession(session_id.to_string()))?;

        let result = session.take_turn(board, player_id, &mut **dice)?;
        let finished = session.has_winner();
        if finished {
            info!(session = session_id, winner = %result.player_name, round = session.round(), "Game won");
        }
        let artifact = match renderer.render(session_id, &session.markers()) {
            Ok(artifact) => Some(artifact),
            Err(err) => {
                warn!(session = session_id, "Failed to redraw board: {err:#}");
                None
            }
        };
        Ok(TurnReport {
            result,
            artifact,
            finished,
        })
    }

    pub fn has_winner(&self, session_id: &str) -> bool {
        self.inner
            .read()
            .sessions
            .get(session_id)
            .map(GameSession::has_winner)
            .unwrap_or(false)
    }

    pub fn advance_turn(&self, session_id: &str) -> Result<(), GameError> {
        let mut inner = self.inner.write();
        inner.session_mut(session_id)?.advance_turn()
    }

    /// Close the session and release its board. Also clears a stale board
    /// left behind without a live session.
    pub fn end(&self, session_id: &str) -> Result<(), GameError> {
        let mut inner = self.inner.write();
        let removed = inner.sessions.remove(session_id);
        let had_artifact = inner.renderer.exists(session_id);
        if removed.is_none() && !had_artifact {
            return Err(GameError::UnknownSession(session_id.to_string()));
        }
        if let Some(mut session) = removed {
            session.finish();
            info!(session = session_id, round = session.round(), "Session ended");
        }
        inner
            .renderer
            .release(session_id)
            .map_err(GameError::Render)
    }

    /// Copy of the session for display.
    pub fn snapshot(&self, session_id: &str) -> Option<GameSession> {
        self.inner.read().sessions.get(session_id).cloned()
    }

    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.inner.read().sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.read().sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove sessions idle for longer than the configured TTL as of `now`,
    /// releasing their boards. Returns the expired ids.
    pub fn expire_idle(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut inner = self.inner.write();
        let ttl = inner.ttl;
        let mut expired: Vec<String> = inner
            .sessions
            .iter()
            .filter(|(_, session)| now - session.last_activity() > ttl)
            .map(|(id, _)| id.clone())
            .collect();
        expired.sort();
        for id in &expired {
            inner.sessions.remove(id);
            if let Err(err) = inner.renderer.release(id) {
                warn!(session = %id, "Failed to release expired board: {err}");
            }
            info!(session = %id, "Session expired");
        }
        expired
    }

    /// Remove boards left over from a previous run that no live session owns,
    /// returning how many such stale boards were dropped. Live sessions get
    /// their boards redrawn.
    pub fn purge_artifacts(&self) -> anyhow::Result<usize> {
        let inner = self.inner.read();
        let live = inner
            .sessions
            .keys()
            .filter(|id| inner.renderer.exists(id))
            .count();
        let removed = inner.renderer.purge()?;
        for (id, session) in &inner.sessions {
            inner.renderer.render(id, &session.markers())?;
        }
        let stale = removed.saturating_sub(live);
        if stale > 0 {
            info!(stale, "Purged stale boards");
        }
        Ok(stale)
    }
}

impl Inner {
    fn session_mut(&mut self, session_id: &str) -> Result<&mut GameSession, GameError> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| GameError::UnknownSession(session_id.to_string()))
    }
}
