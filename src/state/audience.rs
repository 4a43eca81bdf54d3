//! Audience registration and voting.

use super::registry::ConnHandle;
use super::AppState;
use crate::board::CellPos;
use crate::protocol::ServerMessage;
use crate::types::{RoundStatus, VoteRecord};

fn default_nickname() -> String {
    petname::petname(2, "-").unwrap_or_else(|| "anonymous".to_string())
}

impl AppState {
    /// Register an audience connection, minting a client id and nickname as
    /// needed. Rejoining with a known client id reclaims the same identity
    /// (and any stats already earned under it).
    pub async fn audience_join(
        &self,
        conn: ConnHandle,
        client_id: Option<String>,
        nickname: Option<String>,
    ) {
        let mut guard = self.room.lock().await;
        let room = &mut *guard;

        let client_id = client_id.unwrap_or_else(|| ulid::Ulid::new().to_string());
        let nickname = match nickname {
            Some(name) => name,
            None => room
                .registry
                .audience_nickname(&client_id)
                .map(str::to_string)
                .unwrap_or_else(default_nickname),
        };

        room.registry
            .upsert_audience(&client_id, nickname.clone(), conn.clone());
        room.stats.ensure(&client_id, &nickname);

        conn.send(&ServerMessage::ClientRegistered {
            client_id: client_id.clone(),
            nickname: nickname.clone(),
        });
        conn.send(&ServerMessage::GameStateUpdate(
            room.view_for(Some(&client_id)),
        ));
        tracing::info!("Audience member {} joined as '{}'", client_id, nickname);
    }

    /// Count one audience vote. Ignored outside the voting window, from
    /// unregistered client ids, on occupied cells, or on a second attempt;
    /// a counted vote is broadcast to everyone immediately.
    pub async fn submit_vote(&self, client_id: &str, pos: CellPos) {
        let mut guard = self.room.lock().await;
        let room = &mut *guard;

        if room.game.status != RoundStatus::Voting {
            tracing::debug!("Dropping VOTE in status {:?}", room.game.status);
            return;
        }
        if !room.registry.contains_audience(client_id) {
            tracing::debug!("Dropping VOTE from unregistered client {}", client_id);
            return;
        }

        match room.tally.cast_vote(&room.game.board, client_id, pos) {
            Ok(()) => {
                room.vote_log.push(VoteRecord {
                    round: room.game.current_round,
                    client_id: client_id.to_string(),
                    position: pos,
                    cast_at: chrono::Utc::now(),
                });
                tracing::debug!("Vote from {} for {}", client_id, pos);
                room.broadcast_state();
            }
            Err(e) => {
                tracing::debug!("Vote from {} rejected: {}", client_id, e);
            }
        }
    }
}
