//! Transactional storage seam.
//!
//! A [`Store`] hands out [`UnitOfWork`]s. Every settlement operation runs
//! inside exactly one unit of work, which ends in [`UnitOfWork::commit`] or
//! [`UnitOfWork::rollback`]. Dropping a unit of work without committing
//! rolls it back, so an early `?` return never leaves a partial write.
//!
//! Backends must provide:
//! - row locks: `*_for_update` reads keep the row locked until the unit of
//!   work ends, so read-then-write sequences on that row are serialized
//! - guarded updates: balance and status changes are applied relative to the
//!   stored row (`balance = balance + delta`, `WHERE status = 'open'`)
//! - uniqueness: inserts report an existing key instead of overwriting
//!
//! Two backends are provided: [`PgStore`] (PostgreSQL through sqlx) and
//! [`MemoryStore`] (serialized in-process transactions).

use crate::db::timeouts::TimeoutError;
use crate::ledger::{Player, PlayerId};
use crate::tournament::{Tournament, TournamentId};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// PostgreSQL `serialization_failure`
const SQLSTATE_SERIALIZATION_FAILURE: &str = "40001";

/// PostgreSQL `deadlock_detected`
const SQLSTATE_DEADLOCK_DETECTED: &str = "40P01";

/// Backend errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transaction lost a race and may be retried
    #[error("Transaction conflict: {0}")]
    Conflict(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Statement did not finish in time
    #[error("Database operation timed out after {0:?}")]
    Timeout(Duration),

    /// Stored row could not be decoded
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let conflict = match &err {
            sqlx::Error::Database(db) => matches!(
                db.code().as_deref(),
                Some(SQLSTATE_SERIALIZATION_FAILURE | SQLSTATE_DEADLOCK_DETECTED)
            ),
            _ => false,
        };

        if conflict {
            StoreError::Conflict(err.to_string())
        } else {
            StoreError::Database(err)
        }
    }
}

impl From<TimeoutError> for StoreError {
    fn from(err: TimeoutError) -> Self {
        match err {
            TimeoutError::Timeout(duration) => StoreError::Timeout(duration),
            TimeoutError::Database(e) => e.into(),
        }
    }
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Source of units of work
#[async_trait]
pub trait Store: Send + Sync {
    /// Begin a unit of work
    async fn begin(&self) -> StoreResult<Box<dyn UnitOfWork>>;

    /// Check that the backend is reachable
    async fn health_check(&self) -> StoreResult<()>;

    /// Short backend name for logs and health output
    fn backend(&self) -> &'static str;
}

/// One atomic transaction against the store.
///
/// Methods returning `bool` report whether the guarded write happened;
/// `false` means the key was taken or the guard did not match.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Read a player without locking
    async fn player(&mut self, id: PlayerId) -> StoreResult<Option<Player>>;

    /// Read and lock a player
    async fn player_for_update(&mut self, id: PlayerId) -> StoreResult<Option<Player>>;

    /// Insert a player unless the id is taken
    async fn insert_player(&mut self, player: &Player) -> StoreResult<bool>;

    /// Apply `balance = balance + delta` unless the result would be negative.
    ///
    /// Returns the new balance, or `None` if the player is missing or the
    /// guard rejected the change.
    async fn adjust_balance(&mut self, id: PlayerId, delta: i64) -> StoreResult<Option<i64>>;

    /// Read a tournament without locking
    async fn tournament(&mut self, id: TournamentId) -> StoreResult<Option<Tournament>>;

    /// Read and lock a tournament
    async fn tournament_for_update(&mut self, id: TournamentId)
    -> StoreResult<Option<Tournament>>;

    /// Insert a tournament unless the id is taken
    async fn insert_tournament(&mut self, tournament: &Tournament) -> StoreResult<bool>;

    /// Set the prize pool of an open tournament
    async fn set_prize_pool(&mut self, id: TournamentId, amount: i64) -> StoreResult<bool>;

    /// Pre-assign the winner of an open tournament
    async fn set_winner(&mut self, id: TournamentId, winner: PlayerId) -> StoreResult<bool>;

    /// Transition an open tournament to finished, recording the winner and
    /// the disbursed pool and zeroing the pool
    async fn mark_finished(
        &mut self,
        id: TournamentId,
        winner: Option<PlayerId>,
        prize_paid: i64,
    ) -> StoreResult<bool>;

    /// All finished tournaments, oldest settlement first
    async fn finished_tournaments(&mut self) -> StoreResult<Vec<Tournament>>;

    /// Insert an enrollment unless the pair exists
    async fn insert_enrollment(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool>;

    /// Whether the pair is enrolled
    async fn is_enrolled(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> StoreResult<bool>;

    /// Enrolled players in ascending id order
    async fn enrolled_players(&mut self, tournament_id: TournamentId)
    -> StoreResult<Vec<PlayerId>>;

    /// Make all writes of this unit of work visible
    async fn commit(self: Box<Self>) -> StoreResult<()>;

    /// Discard all writes of this unit of work
    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
