//! WebSocket message dispatch
//!
//! Single entry point for typed client messages. A connection carries no
//! ambient role; whether it holds the host seat or a registered audience
//! identity is checked by the state methods against the registry, and
//! anything illegal is dropped there.

use std::sync::Arc;

use crate::board::CellPos;
use crate::protocol::ClientMessage;
use crate::state::{AppState, ConnHandle};

/// Handle one parsed client message.
pub async fn handle_message(state: &Arc<AppState>, conn: &ConnHandle, msg: ClientMessage) {
    match msg {
        ClientMessage::HostJoin => state.host_join(conn.clone()).await,

        ClientMessage::AudienceJoin {
            client_id,
            nickname,
        } => state.audience_join(conn.clone(), client_id, nickname).await,

        ClientMessage::PlaceStone { row, col } => {
            state.place_stone(conn.conn_id, CellPos::new(row, col)).await
        }

        ClientMessage::Vote {
            row,
            col,
            client_id,
        } => state.submit_vote(&client_id, CellPos::new(row, col)).await,

        ClientMessage::ResetGame => state.reset_game(conn.conn_id).await,
    }
}
