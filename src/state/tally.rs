//! Vote collection and plurality resolution for one voting round.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::board::{Board, CellPos};
use crate::config::TieBreak;
use crate::state::GameError;
use crate::types::ClientId;

/// Per-round vote state. Counts are keyed by position and keep the order in
/// which each position received its first vote; that order is what the
/// first-vote tie-break resolves on.
#[derive(Debug, Default)]
pub struct VoteTally {
    counts: IndexMap<CellPos, u32>,
    voted: HashSet<ClientId>,
}

impl VoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> &IndexMap<CellPos, u32> {
        &self.counts
    }

    pub fn has_voted(&self, client_id: &str) -> bool {
        self.voted.contains(client_id)
    }

    /// Count one client's vote for a position.
    ///
    /// A client gets at most one counted vote per round, but a rejected
    /// position does not use it up; they may vote again.
    pub fn cast_vote(
        &mut self,
        board: &Board,
        client_id: &str,
        pos: CellPos,
    ) -> Result<(), GameError> {
        if self.voted.contains(client_id) {
            return Err(GameError::AlreadyVoted);
        }
        if !board.is_open(pos) {
            return Err(GameError::IllegalPosition(pos));
        }
        *self.counts.entry(pos).or_insert(0) += 1;
        self.voted.insert(client_id.to_string());
        Ok(())
    }

    /// The winning position under the given tie-break, or `None` if no
    /// votes were cast.
    pub fn resolve(&self, tie_break: TieBreak) -> Option<CellPos> {
        let mut best: Option<(CellPos, u32)> = None;
        for (&pos, &count) in &self.counts {
            let better = match best {
                None => true,
                Some((best_pos, best_count)) => match tie_break {
                    TieBreak::FirstVote => count > best_count,
                    TieBreak::Position => {
                        count > best_count || (count == best_count && pos < best_pos)
                    }
                },
            };
            if better {
                best = Some((pos, count));
            }
        }
        best.map(|(pos, _)| pos)
    }

    /// Drop all counts and per-client vote markers for a fresh round.
    pub fn clear(&mut self) {
        self.counts.clear();
        self.voted.clear();
    }
}
