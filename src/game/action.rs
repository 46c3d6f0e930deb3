use serde::{Deserialize, Serialize};
use thiserror::Error;

/// An action submitted by a player over their WebSocket connection.
/// `set_current_word` is the live typing indicator shown to the other
/// players; `submit_guess` commits the current word as a guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PlayerAction {
    SetCurrentWord { letters: Vec<String> },
    SubmitGuess { letters: Vec<String> },
}

/// Why a session rejected an action or a membership operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("player is not a member of this session")]
    UnknownPlayer,
    #[error("guess must be exactly {expected} letters")]
    WrongLength { expected: u32 },
}
