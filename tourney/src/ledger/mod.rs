//! Ledger: player accounts and balance mutations.
//!
//! All operations run inside a caller-supplied [`UnitOfWork`](crate::store::UnitOfWork),
//! so they compose into a single transaction with registry and enrollment
//! writes. Amounts are minor units; see [`crate::money`] for conversion.
//!
//! - Debits are guarded read-modify-writes: a balance never drops below zero.
//! - Credits check for overflow before touching the row.

pub mod accounts;
pub mod models;

pub use accounts::{credit, debit, ensure_account, get_balance, get_player, open_account};
pub use models::{Player, PlayerId};
