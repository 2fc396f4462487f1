//! Settlement: moving money between balances and prize pools.
//!
//! [`SettlementEngine`] runs each operation as one unit of work against a
//! [`Store`](crate::store::Store). Locks are taken tournament first, then
//! player. Units of work that lose a race are run again under the engine's
//! [`RetryPolicy`].

pub mod engine;
pub mod models;
pub mod random;
pub mod retry;

pub use engine::SettlementEngine;
pub use models::{FinishOutcome, JoinReceipt};
pub use random::{FixedSequence, RandomSource, SeededRandom, ThreadRandom};
pub use retry::RetryPolicy;
