pub mod action;
pub mod session;

pub use action::{ApplyError, PlayerAction};
pub use session::{GameParameters, GuessRecord, PlayerId, Session, SessionId};
