//! Ledger data models.

use serde::{Deserialize, Serialize};

/// Player ID type
pub type PlayerId = i64;

/// Player account. `balance` is in minor units and never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub display_name: String,
    pub balance: i64,
}

impl Player {
    /// Display name given to accounts opened implicitly by funding
    pub fn default_display_name(id: PlayerId) -> String {
        format!("player-{id}")
    }
}
