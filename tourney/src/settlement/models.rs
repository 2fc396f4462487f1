//! Settlement results.

use crate::ledger::PlayerId;
use crate::tournament::TournamentId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Effect of a successful join, in major units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReceipt {
    pub player_id: PlayerId,
    pub tournament_id: TournamentId,
    /// Player balance after the deposit was taken
    pub balance: Decimal,
    /// Pool after the deposit was added
    pub prize_pool: Decimal,
}

/// Result of settling a tournament, in major units
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishOutcome {
    pub tournament_id: TournamentId,
    /// `None` when nobody was enrolled and no winner was assigned
    pub winner_id: Option<PlayerId>,
    pub prize_paid: Decimal,
    /// Winner balance after the payout; zero without a winner
    pub winner_balance: Decimal,
}
