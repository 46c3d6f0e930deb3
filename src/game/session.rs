//! One game instance: membership, parameters, and the guess board.
//!
//! The session owns which players are members and the evolving guess
//! history. Word validation and scoring live in the rule engine, not here.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ws::PlayerSender;

use super::action::{ApplyError, PlayerAction};

/// Opaque session identifier. Generated once at creation, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a path segment into a SessionId. An unparseable segment can
    /// never name a live session, so callers treat `None` as not-found.
    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Opaque player identifier, unique within a session. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(Uuid);

impl PlayerId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Immutable configuration snapshot for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameParameters {
    #[serde(default = "default_word_length")]
    pub word_length: u32,
    #[serde(default = "default_max_guesses")]
    pub max_guesses: u32,
}

impl Default for GameParameters {
    fn default() -> Self {
        Self {
            word_length: 5,
            max_guesses: 5,
        }
    }
}

fn default_word_length() -> u32 {
    5
}

fn default_max_guesses() -> u32 {
    5
}

/// One committed guess, kept so late joiners can reconstruct the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuessRecord {
    pub player_id: PlayerId,
    pub letters: Vec<String>,
}

/// A live game session: parameters fixed at creation, players coming and
/// going, and the shared guess history.
pub struct Session {
    id: SessionId,
    params: GameParameters,
    players: HashMap<PlayerId, PlayerSender>,
    guesses: Vec<GuessRecord>,
}

impl Session {
    pub(crate) fn new(id: SessionId, params: GameParameters) -> Self {
        Self {
            id,
            params,
            players: HashMap::new(),
            guesses: Vec::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn params(&self) -> GameParameters {
        self.params
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn guesses(&self) -> &[GuessRecord] {
        &self.guesses
    }

    /// Iterate over the outbound channel of every member.
    pub(crate) fn senders(&self) -> impl Iterator<Item = (&PlayerId, &PlayerSender)> {
        self.players.iter()
    }

    /// Admit a new player and hand back their generated id.
    pub(crate) fn add_player(&mut self, sender: PlayerSender) -> PlayerId {
        let player_id = PlayerId::generate();
        self.players.insert(player_id, sender);
        player_id
    }

    /// Remove a member. Returns whether the session is now empty, or
    /// `None` if the player was not a member.
    pub(crate) fn remove_player(&mut self, player_id: &PlayerId) -> Option<bool> {
        self.players.remove(player_id)?;
        Some(self.players.is_empty())
    }

    /// Apply a player action to the session state. The validated action is
    /// handed back so the caller can fan it out to the other members.
    pub(crate) fn apply(
        &mut self,
        player_id: &PlayerId,
        action: PlayerAction,
    ) -> Result<PlayerAction, ApplyError> {
        if !self.players.contains_key(player_id) {
            return Err(ApplyError::UnknownPlayer);
        }

        match &action {
            PlayerAction::SetCurrentWord { letters } => {
                // Partial words are fine while typing, overlong ones are not.
                if letters.len() as u32 > self.params.word_length {
                    return Err(ApplyError::WrongLength {
                        expected: self.params.word_length,
                    });
                }
            }
            PlayerAction::SubmitGuess { letters } => {
                if letters.len() as u32 != self.params.word_length {
                    return Err(ApplyError::WrongLength {
                        expected: self.params.word_length,
                    });
                }
                self.guesses.push(GuessRecord {
                    player_id: *player_id,
                    letters: letters.clone(),
                });
            }
        }

        Ok(action)
    }
}
