use crate::game::GameParameters;
use crate::registry::SessionRegistry;

/// Shared application state passed to all handlers via axum State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Live session registry; owns the idle-close scheduling.
    pub registry: SessionRegistry,
    /// Parameters stamped onto newly created sessions.
    pub game_params: GameParameters,
}
