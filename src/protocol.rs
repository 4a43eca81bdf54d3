//! WebSocket protocol messages.
//!
//! Every frame is a JSON envelope `{"type": "...", "payload": {...}}` with
//! camelCase payload keys. Unknown or malformed frames are logged and
//! dropped without a reply.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::types::{GameId, RoundStatus, Side, TopPlayers};

/// Messages from clients to the server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    /// Claim the host seat and start a fresh game.
    HostJoin,
    /// Join (or rejoin) as an anonymous audience member.
    #[serde(rename_all = "camelCase")]
    AudienceJoin {
        client_id: Option<String>,
        nickname: Option<String>,
    },
    /// Host places a stone during their turn.
    PlaceStone { row: usize, col: usize },
    /// Audience member votes for where the crowd stone should go.
    #[serde(rename_all = "camelCase")]
    Vote {
        row: usize,
        col: usize,
        client_id: String,
    },
    /// Host discards the current game and starts over.
    ResetGame,
}

/// Messages from the server to clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    GameCreated { game_id: GameId },
    #[serde(rename_all = "camelCase")]
    ClientRegistered { client_id: String, nickname: String },
    GameStateUpdate(GameStateView),
}

/// Snapshot of the game as one recipient sees it.
///
/// Identical for everyone except `my_stats`, which only appears for an
/// audience recipient once the game is finished.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GameStateView {
    pub game_id: GameId,
    pub board: Board,
    pub status: RoundStatus,
    pub winner: Option<Side>,
    /// Current-round vote counts keyed `"row,col"`, in first-vote order.
    pub votes: IndexMap<String, u32>,
    pub timer: u32,
    pub current_round: u32,
    pub top_players: Option<TopPlayers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_stats: Option<PersonalStats>,
}

/// The recipient's own vote statistics, shown on the finished screen.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PersonalStats {
    pub matches: u32,
    pub mismatches: u32,
    pub total: u32,
    pub match_rate: u32,
}
