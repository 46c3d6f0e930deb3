//! Live session registry.
//!
//! Owns the map from SessionId to Session and every mutation of it:
//! creation, membership changes, action application, and idle removal.
//! Per-session mutual exclusion comes from the DashMap entry guard; every
//! operation below does all of its checking and mutating while holding the
//! guard for that one session, and never awaits while holding it. The
//! idle-close fire path takes the same guard through `remove_if`, so a
//! join and a concurrent fire always resolve to exactly one outcome.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use thiserror::Error;

use crate::game::{
    ApplyError, GameParameters, GuessRecord, PlayerAction, PlayerId, Session, SessionId,
};
use crate::ws::broadcast;
use crate::ws::protocol::ServerMessage;
use crate::ws::PlayerSender;

pub mod idle;

use idle::IdleState;

/// Errors surfaced to the connection handler. All are local and retryable;
/// none should ever take the process down.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The SessionId has no live entry: it never existed, or the idle
    /// close already removed it.
    #[error("session not found")]
    SessionNotFound,
    /// The PlayerId is not a member of the addressed session.
    #[error("player not found in session")]
    PlayerNotFound,
    /// The session rejected the action (e.g. a guess of the wrong length).
    #[error("invalid action: {0}")]
    InvalidAction(String),
}

/// Serialized shape returned by the session creation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: SessionId,
    pub params: GameParameters,
}

/// Everything a freshly joined player needs to render the board.
#[derive(Debug, Clone)]
pub struct JoinedSession {
    pub player_id: PlayerId,
    pub params: GameParameters,
    pub players: Vec<PlayerId>,
    pub previous_guesses: Vec<GuessRecord>,
}

struct SessionEntry {
    session: Session,
    idle: IdleState,
}

/// Cheaply cloneable handle to the shared session map. One instance is
/// built at startup and handed to the router; clones go to the idle timer
/// tasks.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<DashMap<SessionId, SessionEntry>>,
    idle_timeout: Duration,
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(DashMap::new()),
            idle_timeout,
        }
    }

    /// Allocate a fresh SessionId, insert an empty session, and return the
    /// serializable summary for the creation endpoint.
    pub fn create_session(&self, params: GameParameters) -> SessionInfo {
        let session = Session::new(SessionId::generate(), params);
        let id = session.id();
        self.sessions.insert(id, SessionEntry::new(session));
        tracing::debug!(session_id = %id, "session created");
        SessionInfo { id, params }
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Whether an idle-close timer is currently armed for this session.
    pub fn has_pending_close(&self, id: &SessionId) -> bool {
        self.sessions
            .get(id)
            .map(|entry| entry.idle.is_pending())
            .unwrap_or(false)
    }

    /// Admit a player. A join counts as activity, so any armed idle-close
    /// timer is cancelled under the same entry lock before membership
    /// changes; a timer that already slept its way past the deadline will
    /// fail its generation check and remove nothing.
    pub fn add_player(
        &self,
        id: &SessionId,
        sender: PlayerSender,
    ) -> Result<JoinedSession, RegistryError> {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or(RegistryError::SessionNotFound)?;

        entry.idle.cancel();
        let player_id = entry.session.add_player(sender);
        broadcast::to_others(
            &entry.session,
            &player_id,
            &ServerMessage::PlayerJoined { player_id },
        );

        tracing::debug!(session_id = %id, player_id = %player_id, "player joined");
        Ok(JoinedSession {
            player_id,
            params: entry.session.params(),
            players: entry.session.player_ids(),
            previous_guesses: entry.session.guesses().to_vec(),
        })
    }

    /// Remove a player from a session. When the last member leaves, the
    /// idle-close timer is armed before the entry lock is released.
    pub fn remove_player(
        &self,
        id: &SessionId,
        player_id: &PlayerId,
    ) -> Result<(), RegistryError> {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or(RegistryError::SessionNotFound)?;

        let now_empty = entry
            .session
            .remove_player(player_id)
            .ok_or(RegistryError::PlayerNotFound)?;
        broadcast::to_session(
            &entry.session,
            &ServerMessage::PlayerLeft {
                player_id: *player_id,
            },
        );
        tracing::debug!(session_id = %id, player_id = %player_id, "player left");

        if now_empty {
            let registry = self.clone();
            entry.idle.arm(registry, *id, self.idle_timeout);
            tracing::debug!(
                session_id = %id,
                timeout_secs = self.idle_timeout.as_secs(),
                "session empty, close scheduled"
            );
        }
        Ok(())
    }

    /// Apply a player action and fan the result out to the session. Typing
    /// updates go to the other members; committed guesses go to everyone.
    pub fn queue_action(
        &self,
        id: &SessionId,
        player_id: &PlayerId,
        action: PlayerAction,
    ) -> Result<(), RegistryError> {
        let mut entry = self
            .sessions
            .get_mut(id)
            .ok_or(RegistryError::SessionNotFound)?;

        let applied = entry
            .session
            .apply(player_id, action)
            .map_err(|err| match err {
                ApplyError::UnknownPlayer => RegistryError::PlayerNotFound,
                other => RegistryError::InvalidAction(other.to_string()),
            })?;

        match applied {
            PlayerAction::SetCurrentWord { letters } => broadcast::to_others(
                &entry.session,
                player_id,
                &ServerMessage::CurrentWord {
                    player_id: *player_id,
                    letters,
                },
            ),
            PlayerAction::SubmitGuess { letters } => broadcast::to_session(
                &entry.session,
                &ServerMessage::GuessSubmitted {
                    player_id: *player_id,
                    letters,
                },
            ),
        }
        Ok(())
    }

    /// Current parameters snapshot for a session.
    pub fn parameters(&self, id: &SessionId) -> Result<GameParameters, RegistryError> {
        self.sessions
            .get(id)
            .map(|entry| entry.session.params())
            .ok_or(RegistryError::SessionNotFound)
    }

    /// Deadline path of the idle-close scheduler. Removes the session only
    /// if the firing timer is still the armed one and the session is still
    /// empty; both checks run under the entry lock, so a join that slipped
    /// in first wins and the removal becomes a no-op.
    pub(crate) fn finish_close(&self, id: &SessionId, generation: u64) {
        let removed = self.sessions.remove_if(id, |_, entry| {
            entry.idle.is_armed(generation) && entry.session.is_empty()
        });
        if removed.is_some() {
            tracing::info!(session_id = %id, "idle session closed");
        }
    }
}

impl SessionEntry {
    fn new(session: Session) -> Self {
        Self {
            session,
            idle: IdleState::new(),
        }
    }
}
