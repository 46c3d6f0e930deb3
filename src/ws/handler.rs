use axum::{
    extract::{ws::WebSocketUpgrade, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::game::SessionId;
use crate::state::AppState;
use crate::ws::actor;

/// GET /session/{session_id}
/// WebSocket join endpoint. Rejects unknown sessions with 404 before
/// upgrading; an unparseable id can never name a live session, so it gets
/// the same answer. The definitive membership check happens again inside
/// the registry after the upgrade (the idle timer may fire in between).
pub async fn ws_join(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let Some(session_id) = SessionId::parse(&session_id) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if !state.registry.contains(&session_id) {
        tracing::debug!(session_id = %session_id, "join rejected, unknown session");
        return StatusCode::NOT_FOUND.into_response();
    }

    ws.on_upgrade(move |socket| actor::run_connection(socket, state, session_id))
}
