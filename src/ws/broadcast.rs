//! Session-scoped fan-out: push a server message to the members of one
//! session over their outbound channels. Sends to closed channels are
//! ignored; the owning connection is already on its way out.

use crate::game::{PlayerId, Session};

use super::protocol::ServerMessage;

/// Send a message to every member of the session.
pub fn to_session(session: &Session, msg: &ServerMessage) {
    let ws_msg = msg.to_ws_message();
    for (_, sender) in session.senders() {
        let _ = sender.send(ws_msg.clone());
    }
}

/// Send a message to every member except `skip` (typically the originator).
pub fn to_others(session: &Session, skip: &PlayerId, msg: &ServerMessage) {
    let ws_msg = msg.to_ws_message();
    for (player_id, sender) in session.senders() {
        if player_id != skip {
            let _ = sender.send(ws_msg.clone());
        }
    }
}
