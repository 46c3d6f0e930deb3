use axum::{extract::State, routing::get, Json, Router};

use crate::registry::SessionInfo;
use crate::state::AppState;
use crate::ws::handler as ws_handler;

/// GET /new — create a fresh session and return its id and parameters.
async fn create_session(State(state): State<AppState>) -> Json<SessionInfo> {
    let info = state.registry.create_session(state.game_params);
    Json(info)
}

/// Build the full axum Router with all routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/new", get(create_session))
        .route("/session/{session_id}", get(ws_handler::ws_join))
        .with_state(state)
}
