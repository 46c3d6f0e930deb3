use axum::extract::ws::{CloseFrame, Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};

use crate::game::SessionId;
use crate::state::AppState;
use crate::ws::protocol::{self, ServerMessage};

/// Ping interval: server sends a WebSocket ping every 30 seconds so
/// abruptly dropped connections still get torn down and counted as leaves.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Pong timeout: if no pong arrives within 10 seconds after a ping, close.
const PONG_TIMEOUT: Duration = Duration::from_secs(10);

/// Close code sent when the session vanished between the upgrade check and
/// the join (the idle close committed first).
const CLOSE_SESSION_GONE: u16 = 4004;

/// Run the actor-per-connection pattern for a joined player.
///
/// Splits the WebSocket into reader and writer halves:
/// - Writer task: owns the sink, forwards messages from an mpsc channel
/// - Reader task: parses inbound frames and forwards actions to the registry
///
/// The registry clones the mpsc sender to push session events to this
/// player. Whatever way the reader loop ends, `remove_player` runs exactly
/// once afterwards.
pub async fn run_connection(socket: WebSocket, state: AppState, session_id: SessionId) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    // Join under the registry's per-session lock. The idle timer may have
    // removed the session after the handler's check; that removal is the
    // committed outcome, so just close the fresh socket.
    let joined = match state.registry.add_player(&session_id, tx.clone()) {
        Ok(joined) => joined,
        Err(err) => {
            tracing::debug!(
                session_id = %session_id,
                error = %err,
                "join failed after upgrade"
            );
            let _ = ws_sender
                .send(Message::Close(Some(CloseFrame {
                    code: CLOSE_SESSION_GONE,
                    reason: "session not found".into(),
                })))
                .await;
            return;
        }
    };
    let player_id = joined.player_id;

    // Greet the new player with their id and the current board state.
    let _ = tx.send(
        ServerMessage::Joined {
            player_id,
            params: joined.params,
            players: joined.players,
            previous_guesses: joined.previous_guesses,
        }
        .to_ws_message(),
    );

    tracing::info!(
        session_id = %session_id,
        player_id = %player_id,
        "player connected"
    );

    // Spawn writer task: forwards mpsc messages to the WebSocket sink
    let writer_handle = tokio::spawn(writer_task(ws_sender, rx));

    // Track pong reception
    let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<()>();

    // Spawn ping task: sends periodic pings and monitors pong responses
    let ping_tx = tx.clone();
    let ping_handle = tokio::spawn(async move {
        let mut ping_timer = interval(PING_INTERVAL);
        // Skip the first immediate tick
        ping_timer.tick().await;

        loop {
            ping_timer.tick().await;

            if ping_tx.send(Message::Ping(vec![1, 2, 3, 4].into())).is_err() {
                // Writer task has died — connection is gone
                break;
            }

            match timeout(PONG_TIMEOUT, pong_rx.recv()).await {
                Ok(Some(())) => {
                    // Pong received, continue
                }
                _ => {
                    tracing::warn!(player_id = %player_id, "pong timeout, closing connection");
                    let _ = ping_tx.send(Message::Close(Some(CloseFrame {
                        code: 1001,
                        reason: "Pong timeout".into(),
                    })));
                    break;
                }
            }
        }
    });

    // Reader loop: process incoming WebSocket frames
    loop {
        match ws_receiver.next().await {
            Some(Ok(msg)) => match msg {
                Message::Text(text) => {
                    protocol::handle_text_message(
                        text.as_str(),
                        &tx,
                        &state,
                        &session_id,
                        &player_id,
                    );
                }
                Message::Binary(_) => {
                    tracing::debug!(
                        player_id = %player_id,
                        "ignoring binary frame (protocol is JSON text)"
                    );
                }
                Message::Pong(_) => {
                    let _ = pong_tx.send(());
                }
                Message::Ping(data) => {
                    let _ = tx.send(Message::Pong(data));
                }
                Message::Close(frame) => {
                    tracing::info!(
                        player_id = %player_id,
                        reason = ?frame,
                        "client initiated close"
                    );
                    break;
                }
            },
            Some(Err(e)) => {
                tracing::warn!(
                    player_id = %player_id,
                    error = %e,
                    "WebSocket receive error"
                );
                break;
            }
            None => {
                tracing::info!(player_id = %player_id, "WebSocket stream ended");
                break;
            }
        }
    }

    // Cleanup: abort writer and ping tasks
    writer_handle.abort();
    ping_handle.abort();

    // Exactly one removal per successful join, on every exit path.
    // SessionNotFound here means the idle close already committed.
    match state.registry.remove_player(&session_id, &player_id) {
        Ok(()) => {
            tracing::info!(
                session_id = %session_id,
                player_id = %player_id,
                "player disconnected"
            );
        }
        Err(err) => {
            tracing::debug!(
                session_id = %session_id,
                player_id = %player_id,
                error = %err,
                "session already gone on disconnect"
            );
        }
    }
}

/// Writer task: receives messages from the mpsc channel and forwards them
/// to the WebSocket sink.
async fn writer_task(
    mut ws_sender: futures_util::stream::SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(msg) = rx.recv().await {
        if ws_sender.send(msg).await.is_err() {
            // WebSocket send failed — connection is broken
            break;
        }
    }
}
