use serde::{Deserialize, Serialize};

use crate::board::{Board, CellPos};

/// Opaque ID types for type safety
pub type GameId = String;
pub type ClientId = String;

/// Which side a stone belongs to. On the wire this is the integer 1 (host)
/// or 2 (audience); an empty cell is `null`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(into = "u8", try_from = "u8")]
pub enum Side {
    Host = 1,
    Audience = 2,
}

impl From<Side> for u8 {
    fn from(side: Side) -> u8 {
        side as u8
    }
}

impl TryFrom<u8> for Side {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Side::Host),
            2 => Ok(Side::Audience),
            other => Err(format!("invalid side value: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundStatus {
    /// No host connected yet.
    Ready,
    HostTurn,
    Voting,
    Finished,
}

/// The canonical game state. Exactly one lives per process, replaced
/// wholesale on a fresh host join or reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub game_id: GameId,
    pub board: Board,
    pub status: RoundStatus,
    pub winner: Option<Side>,
    /// Seconds remaining in the current voting round; untouched outside Voting.
    pub timer: u32,
    /// Increments exactly once per resolved voting round.
    pub current_round: u32,
    pub top_players: Option<TopPlayers>,
}

impl GameState {
    pub fn new(game_id: GameId, vote_seconds: u32) -> Self {
        Self {
            game_id,
            board: Board::new(),
            status: RoundStatus::HostTurn,
            winner: None,
            timer: vote_seconds,
            current_round: 0,
            top_players: None,
        }
    }
}

/// One counted vote, kept for the lifetime of the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRecord {
    pub round: u32,
    pub client_id: ClientId,
    pub position: CellPos,
    pub cast_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregate standing of one audience member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub nickname: String,
    pub matches: u32,
    pub mismatches: u32,
    pub total_rounds: u32,
    /// round(matches / totalRounds × 100); 0 when no rounds were voted.
    pub match_rate: u32,
}

/// Best and worst crowd-agreement performers, computed once the game ends.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopPlayers {
    pub best: PlayerStats,
    pub worst: PlayerStats,
}
