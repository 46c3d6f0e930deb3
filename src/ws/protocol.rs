use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::game::{GameParameters, GuessRecord, PlayerAction, PlayerId, SessionId};
use crate::registry::RegistryError;
use crate::state::AppState;

/// Messages pushed from the server to a player. Inbound player actions are
/// deserialized directly as [`PlayerAction`].
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting for a newly joined player: their id plus the current board.
    Joined {
        player_id: PlayerId,
        params: GameParameters,
        players: Vec<PlayerId>,
        previous_guesses: Vec<GuessRecord>,
    },
    PlayerJoined {
        player_id: PlayerId,
    },
    PlayerLeft {
        player_id: PlayerId,
    },
    /// Another player's in-progress word (typing indicator).
    CurrentWord {
        player_id: PlayerId,
        letters: Vec<String>,
    },
    GuessSubmitted {
        player_id: PlayerId,
        letters: Vec<String>,
    },
    Error {
        code: u16,
        message: String,
    },
}

impl ServerMessage {
    /// Serialize into a WebSocket text frame. These enums serialize
    /// infallibly; an empty object stands in rather than panicking.
    pub fn to_ws_message(&self) -> Message {
        match serde_json::to_string(self) {
            Ok(json) => Message::Text(json.into()),
            Err(_) => Message::Text("{}".into()),
        }
    }
}

/// Handle one inbound text frame: parse the action and forward it to the
/// registry. Called inline from the reader loop, so a connection's actions
/// reach the session in submission order.
pub fn handle_text_message(
    text: &str,
    tx: &mpsc::UnboundedSender<Message>,
    state: &AppState,
    session_id: &SessionId,
    player_id: &PlayerId,
) {
    let action: PlayerAction = match serde_json::from_str(text) {
        Ok(action) => action,
        Err(err) => {
            tracing::debug!(
                player_id = %player_id,
                error = %err,
                "failed to parse action message"
            );
            send_error(tx, 400, "invalid action message");
            return;
        }
    };

    if let Err(err) = state.registry.queue_action(session_id, player_id, action) {
        let code = match err {
            RegistryError::SessionNotFound | RegistryError::PlayerNotFound => 404,
            RegistryError::InvalidAction(_) => 400,
        };
        send_error(tx, code, &err.to_string());
    }
}

/// Push an error frame to one player.
pub fn send_error(tx: &mpsc::UnboundedSender<Message>, code: u16, message: &str) {
    let _ = tx.send(
        ServerMessage::Error {
            code,
            message: message.to_string(),
        }
        .to_ws_message(),
    );
}
