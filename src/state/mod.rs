//! Server state: one game room behind one lock.
//!
//! Every command handler acquires the room mutex, validates against the
//! canonical state, mutates, and queues outbound frames before releasing.
//! Sends go through per-connection unbounded channels and never block,
//! so holding the lock across a broadcast is fine.

pub mod audience;
pub mod game;
pub mod registry;
pub mod stats;
pub mod tally;
pub mod timer;

use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;

use crate::board::CellPos;
use crate::config::ServerConfig;
use crate::types::{GameState, RoundStatus, VoteRecord};

pub use registry::{AudienceConn, ConnHandle, ConnId, ConnectionRegistry};
pub use stats::StatsTracker;
pub use tally::VoteTally;
pub use timer::RoundTimer;

/// A command that could not be applied to the current game state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    #[error("position {0} is not an open cell")]
    IllegalPosition(CellPos),
    #[error("client has already voted this round")]
    AlreadyVoted,
}

/// Shared application state
pub struct AppState {
    pub config: ServerConfig,
    pub room: Mutex<GameRoom>,
    next_conn_id: AtomicU64,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            room: Mutex::new(GameRoom::new(&config)),
            config,
            next_conn_id: AtomicU64::new(1),
        }
    }

    /// Hand out a process-unique id for a new WebSocket connection.
    pub fn next_conn_id(&self) -> ConnId {
        ConnId(self.next_conn_id.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}

/// Everything the room lock protects.
pub struct GameRoom {
    pub game: GameState,
    pub tally: VoteTally,
    pub stats: StatsTracker,
    /// Append-only record of every counted vote, across all rounds.
    pub vote_log: Vec<VoteRecord>,
    pub registry: ConnectionRegistry,
    pub timer: RoundTimer,
}

impl GameRoom {
    pub fn new(config: &ServerConfig) -> Self {
        let mut game = GameState::new(game::generate_game_code(), config.vote_seconds);
        game.status = RoundStatus::Ready;
        Self {
            game,
            tally: VoteTally::new(),
            stats: StatsTracker::new(),
            vote_log: Vec::new(),
            registry: ConnectionRegistry::new(),
            timer: RoundTimer::default(),
        }
    }
}
