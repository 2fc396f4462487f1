//! # Tourney
//!
//! Prize settlement for tournaments with a fixed entry deposit.
//!
//! Players hold balances in a ledger. Joining a tournament moves the
//! deposit from the player's balance into the tournament's prize pool;
//! finishing it pays the whole pool to one winner, picked uniformly from
//! the entrants unless an administrator assigned one. Every operation runs
//! as a single unit of work, so money is never created or lost:
//! the sum of all balances and open pools changes only through external
//! funding.
//!
//! ## Core Modules
//!
//! - [`settlement`]: Join/finish engine, retry policy, winner selection
//! - [`ledger`]: Player accounts and balance movements
//! - [`tournament`]: Tournament registry and lifecycle
//! - [`enrollment`]: Tournament entrants
//! - [`report`]: Results and balance views
//! - [`store`]: Transactional storage, PostgreSQL or in-memory
//! - [`db`]: Connection pool, configuration and schema
//!
//! ## Example
//!
//! ```
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//! use tourney::{MemoryStore, SettlementEngine};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), tourney::TourneyError> {
//! let engine = SettlementEngine::new(Arc::new(MemoryStore::new()));
//! engine.fund(1, Decimal::new(1000, 2)).await?;
//! engine.announce_tournament(7, Decimal::new(250, 2)).await?;
//! let receipt = engine.join(1, 7).await?;
//! assert_eq!(receipt.balance, Decimal::new(750, 2));
//! # Ok(())
//! # }
//! ```

pub mod db;
pub mod enrollment;
pub mod errors;
pub mod ledger;
pub mod money;
pub mod report;
pub mod settlement;
pub mod store;
pub mod tournament;

pub use errors::{Entity, ErrorKind, TourneyError, TourneyResult};
pub use ledger::{Player, PlayerId};
pub use report::{BalanceView, ResultReporter, WinnerSummary};
pub use settlement::{FinishOutcome, JoinReceipt, RetryPolicy, SettlementEngine};
pub use store::{MemoryStore, PgStore, Store, StoreError, UnitOfWork};
pub use tournament::{Tournament, TournamentId, TournamentStatus};
