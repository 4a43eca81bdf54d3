//! Per-client crowd-agreement statistics.

use indexmap::IndexMap;

use crate::protocol::PersonalStats;
use crate::types::{ClientId, PlayerStats, TopPlayers};

/// Percentage of matched rounds, rounded half-up; 0 when nothing was voted.
pub fn match_rate(matches: u32, mismatches: u32) -> u32 {
    let total = matches + mismatches;
    if total == 0 {
        return 0;
    }
    ((matches as f64 / total as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, Default)]
struct PlayerRecord {
    nickname: String,
    matches: u32,
    mismatches: u32,
}

impl PlayerRecord {
    fn stats(&self) -> PlayerStats {
        PlayerStats {
            nickname: self.nickname.clone(),
            matches: self.matches,
            mismatches: self.mismatches,
            total_rounds: self.matches + self.mismatches,
            match_rate: match_rate(self.matches, self.mismatches),
        }
    }
}

/// Tracks, per registered audience member, how often their vote agreed with
/// the resolved crowd stone. Entries are kept in registration order and
/// survive rounds; they reset only when the game itself does.
#[derive(Debug, Default)]
pub struct StatsTracker {
    players: IndexMap<ClientId, PlayerRecord>,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Seed a zeroed entry for a newly registered client. An existing entry
    /// is left untouched, including its nickname.
    pub fn ensure(&mut self, client_id: &str, nickname: &str) {
        if !self.players.contains_key(client_id) {
            self.players.insert(
                client_id.to_string(),
                PlayerRecord {
                    nickname: nickname.to_string(),
                    ..Default::default()
                },
            );
        }
    }

    /// Record one resolved round for a client. Unknown ids are ignored.
    pub fn record(&mut self, client_id: &str, matched: bool) {
        if let Some(record) = self.players.get_mut(client_id) {
            if matched {
                record.matches += 1;
            } else {
                record.mismatches += 1;
            }
        }
    }

    pub fn get(&self, client_id: &str) -> Option<PlayerStats> {
        self.players.get(client_id).map(PlayerRecord::stats)
    }

    pub fn personal(&self, client_id: &str) -> Option<PersonalStats> {
        self.players.get(client_id).map(|record| PersonalStats {
            matches: record.matches,
            mismatches: record.mismatches,
            total: record.matches + record.mismatches,
            match_rate: match_rate(record.matches, record.mismatches),
        })
    }

    /// Best and worst performers by match rate.
    ///
    /// Every registered client counts, including ones who never voted (rate
    /// 0). The sort is stable and descending, so rate ties go to whoever
    /// registered first; with one player, best and worst are the same.
    pub fn ranking(&self) -> Option<TopPlayers> {
        let mut ranked: Vec<PlayerStats> = self.players.values().map(PlayerRecord::stats).collect();
        ranked.sort_by(|a, b| b.match_rate.cmp(&a.match_rate));
        match (ranked.first(), ranked.last()) {
            (Some(best), Some(worst)) => Some(TopPlayers {
                best: best.clone(),
                worst: worst.clone(),
            }),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.players.clear();
    }
}
