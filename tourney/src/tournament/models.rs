//! Tournament data models.

use crate::ledger::PlayerId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tournament ID type
pub type TournamentId = i64;

/// Tournament status. The only transition is `Open` to `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TournamentStatus {
    Open,
    Finished,
}

impl TournamentStatus {
    /// Parse the stored representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(TournamentStatus::Open),
            "finished" => Some(TournamentStatus::Finished),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TournamentStatus::Open => "open",
            TournamentStatus::Finished => "finished",
        }
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tournament model. Amounts are minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tournament {
    pub id: TournamentId,
    /// Stake each entrant pays, fixed at announcement
    pub deposit: i64,
    /// Accumulated stakes; zero once the tournament is settled
    pub prize_pool: i64,
    pub status: TournamentStatus,
    /// Pre-assigned or settled winner
    pub winner_id: Option<PlayerId>,
    /// Pool disbursed at settlement
    pub prize_paid: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl Tournament {
    /// New open tournament with an empty pool
    pub fn announced(id: TournamentId, deposit: i64) -> Self {
        Self {
            id,
            deposit,
            prize_pool: 0,
            status: TournamentStatus::Open,
            winner_id: None,
            prize_paid: None,
            created_at: Utc::now(),
            finished_at: None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == TournamentStatus::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_storage_form() {
        for status in [TournamentStatus::Open, TournamentStatus::Finished] {
            assert_eq!(TournamentStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TournamentStatus::parse("cancelled"), None);
    }

    #[test]
    fn test_announced_tournament_is_open_and_empty() {
        let t = Tournament::announced(3, 500);
        assert_eq!(t.prize_pool, 0);
        assert!(!t.is_finished());
        assert_eq!(t.winner_id, None);
    }
}
