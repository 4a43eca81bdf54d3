//! Game lifecycle commands and round resolution.

use std::sync::Arc;

use rand::Rng;

use super::registry::{ConnHandle, ConnId};
use super::{AppState, GameRoom};
use crate::board::CellPos;
use crate::config::{ResetPolicy, ServerConfig};
use crate::protocol::{GameStateView, ServerMessage};
use crate::types::{GameState, RoundStatus, Side};

/// Characters used for game codes (no 0/O, 1/I/L lookalikes)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 6;

/// Generate a random short game code (6 characters)
pub(super) fn generate_game_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

impl GameRoom {
    /// Project the canonical state into what one recipient may see.
    /// `client_id` is `None` for the host.
    pub fn view_for(&self, client_id: Option<&str>) -> GameStateView {
        let votes = self
            .tally
            .counts()
            .iter()
            .map(|(pos, &count)| (pos.to_string(), count))
            .collect();
        let my_stats = match (self.game.status, client_id) {
            (RoundStatus::Finished, Some(id)) => self.stats.personal(id),
            _ => None,
        };
        GameStateView {
            game_id: self.game.game_id.clone(),
            board: self.game.board.clone(),
            status: self.game.status,
            winner: self.game.winner,
            votes,
            timer: self.game.timer,
            current_round: self.game.current_round,
            top_players: self.game.top_players.clone(),
            my_stats,
        }
    }

    /// Queue a state update for every connected client.
    pub fn broadcast_state(&self) {
        if let Some(host) = self.registry.host() {
            host.send(&ServerMessage::GameStateUpdate(self.view_for(None)));
        }
        for (client_id, conn) in self.registry.audience() {
            conn.handle
                .send(&ServerMessage::GameStateUpdate(self.view_for(Some(client_id))));
        }
    }

    /// Close out the voting round: pick the winning position, settle stats
    /// for everyone who voted, place the crowd stone, and hand the turn back
    /// (or finish the game on a win).
    pub fn resolve_round(&mut self, config: &ServerConfig) {
        self.timer.expire();

        if let Some(winning) = self.tally.resolve(config.tie_break) {
            for record in &self.vote_log {
                if record.round == self.game.current_round {
                    self.stats
                        .record(&record.client_id, record.position == winning);
                }
            }
            match self.game.board.place(winning, Side::Audience) {
                Ok(()) if self.game.board.is_win(winning, Side::Audience) => {
                    self.game.status = RoundStatus::Finished;
                    self.game.winner = Some(Side::Audience);
                    self.game.top_players = self.stats.ranking();
                }
                Ok(()) => self.game.status = RoundStatus::HostTurn,
                Err(e) => {
                    tracing::error!("Winning vote {} is no longer playable: {}", winning, e);
                    self.game.status = RoundStatus::HostTurn;
                }
            }
            tracing::info!(
                "Round {} resolved to {} ({} positions voted)",
                self.game.current_round,
                winning,
                self.tally.counts().len()
            );
        } else {
            // Nobody voted; the turn passes back with no stone placed
            tracing::info!("Round {} resolved with no votes", self.game.current_round);
            self.game.status = RoundStatus::HostTurn;
        }

        self.tally.clear();
        self.game.current_round += 1;
        self.broadcast_state();
    }

    /// Re-seed zeroed stats entries for every audience member still
    /// connected, preserving roster order.
    pub(super) fn reseed_stats_from_registry(&mut self) {
        for (client_id, conn) in self.registry.audience() {
            self.stats.ensure(client_id, &conn.nickname);
        }
    }
}

impl AppState {
    /// Seat a host and start a brand-new game, replacing whatever game was
    /// in progress. Connected audience members carry over with fresh stats.
    pub async fn host_join(self: &Arc<Self>, conn: ConnHandle) {
        let mut guard = self.room.lock().await;
        let room = &mut *guard;

        room.timer.cancel();
        room.game = GameState::new(generate_game_code(), self.config.vote_seconds);
        room.tally.clear();
        room.stats.clear();
        room.vote_log.clear();
        room.reseed_stats_from_registry();
        room.registry.set_host(conn.clone());

        conn.send(&ServerMessage::GameCreated {
            game_id: room.game.game_id.clone(),
        });
        room.broadcast_state();
        tracing::info!("Host connected, created game {}", room.game.game_id);
    }

    /// Apply the host's stone. Ignored unless it really is the host's
    /// connection, their turn, and an open cell.
    pub async fn place_stone(self: &Arc<Self>, conn_id: ConnId, pos: CellPos) {
        let mut guard = self.room.lock().await;
        let room = &mut *guard;

        if !room.registry.is_host(conn_id) {
            tracing::debug!("Dropping PLACE_STONE from non-host connection {:?}", conn_id);
            return;
        }
        if room.game.status != RoundStatus::HostTurn {
            tracing::debug!("Dropping PLACE_STONE in status {:?}", room.game.status);
            return;
        }
        if let Err(e) = room.game.board.place(pos, Side::Host) {
            tracing::debug!("Host move rejected: {}", e);
            return;
        }

        if room.game.board.is_win(pos, Side::Host) {
            room.game.status = RoundStatus::Finished;
            room.game.winner = Some(Side::Host);
            room.game.top_players = room.stats.ranking();
            tracing::info!("Host wins game {} at {}", room.game.game_id, pos);
        } else {
            self.start_voting(room);
        }
        room.broadcast_state();
    }

    /// Throw the current game away and start over with a fresh code.
    /// Host-only; what happens to the audience depends on the reset policy.
    pub async fn reset_game(&self, conn_id: ConnId) {
        let mut guard = self.room.lock().await;
        let room = &mut *guard;

        if !room.registry.is_host(conn_id) {
            tracing::debug!("Dropping RESET_GAME from non-host connection {:?}", conn_id);
            return;
        }

        room.timer.cancel();
        room.game = GameState::new(generate_game_code(), self.config.vote_seconds);
        room.tally.clear();
        room.stats.clear();
        room.vote_log.clear();
        match self.config.reset_policy {
            ResetPolicy::KeepAudience => room.reseed_stats_from_registry(),
            ResetPolicy::ClearAudience => room.registry.close_all_audience(),
        }

        if let Some(host) = room.registry.host() {
            host.send(&ServerMessage::GameCreated {
                game_id: room.game.game_id.clone(),
            });
        }
        room.broadcast_state();
        tracing::info!("Game reset, new game {}", room.game.game_id);
    }

    /// Tear down whatever this connection was. A host leaving ends the game
    /// and disconnects the audience; an audience member leaving just drops
    /// out of the roster (their stats survive for a rejoin).
    pub async fn handle_disconnect(&self, conn_id: ConnId) {
        let mut guard = self.room.lock().await;
        let room = &mut *guard;

        if room.registry.remove_host_conn(conn_id) {
            tracing::info!("Host disconnected, ending game {}", room.game.game_id);
            room.timer.cancel();
            room.registry.close_all_audience();
            room.game.status = RoundStatus::Ready;
            return;
        }
        if let Some(client_id) = room.registry.remove_audience_conn(conn_id) {
            tracing::info!("Audience member {} disconnected", client_id);
        }
    }
}
