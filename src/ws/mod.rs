pub mod actor;
pub mod broadcast;
pub mod handler;
pub mod protocol;

use tokio::sync::mpsc;

/// Sender half of a player connection's outbound channel.
/// The registry clones this to push session events to a specific player.
pub type PlayerSender = mpsc::UnboundedSender<axum::extract::ws::Message>;
