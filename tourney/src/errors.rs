//! Settlement error types.

use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Player(i64),
    Tournament(i64),
    Enrollment { tournament_id: i64, player_id: i64 },
    /// Whole-store operations (begin, commit, listings)
    Store,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Player(id) => write!(f, "player {id}"),
            Entity::Tournament(id) => write!(f, "tournament {id}"),
            Entity::Enrollment {
                tournament_id,
                player_id,
            } => write!(f, "enrollment of player {player_id} in tournament {tournament_id}"),
            Entity::Store => write!(f, "store"),
        }
    }
}

/// Stable classification of a [`TourneyError`], for callers that map
/// errors to responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    AlreadyEnrolled,
    InsufficientFunds,
    TournamentClosed,
    AlreadyFinished,
    NoData,
    InvalidAmount,
    InvalidId,
    Overflow,
    ConcurrencyConflict,
    Storage,
}

/// Settlement errors
#[derive(Debug, Error)]
pub enum TourneyError {
    /// Unknown player or tournament
    #[error("{0} not found")]
    NotFound(Entity),

    /// Id already taken
    #[error("{0} already exists")]
    AlreadyExists(Entity),

    /// Player already enrolled in the tournament
    #[error("Player {player_id} is already enrolled in tournament {tournament_id}")]
    AlreadyEnrolled { tournament_id: i64, player_id: i64 },

    /// Balance lower than the requested debit
    #[error("Insufficient funds for player {player_id}: available {available}, required {required}")]
    InsufficientFunds {
        player_id: i64,
        available: i64,
        required: i64,
    },

    /// Tournament no longer accepts entries or pool changes
    #[error("Tournament {0} is closed")]
    TournamentClosed(i64),

    /// Tournament was already settled
    #[error("Tournament {0} is already finished")]
    AlreadyFinished(i64),

    /// No tournament has finished yet
    #[error("No tournament has finished yet")]
    NoData,

    /// Amount is negative or outside the representable range
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Player and tournament ids start at 1; 0 marks "no winner"
    #[error("Invalid id for {0}: ids start at 1")]
    InvalidId(Entity),

    /// Balance or pool would exceed the integer range
    #[error("Amount overflow on {0}")]
    Overflow(Entity),

    /// Transient storage conflict, still present after retrying
    #[error("Concurrency conflict in {operation} after {attempts} attempt(s)")]
    ConcurrencyConflict {
        operation: &'static str,
        attempts: u32,
    },

    /// Backend failure
    #[error("Storage failure in {operation} on {entity}: {source}")]
    Storage {
        operation: &'static str,
        entity: Entity,
        #[source]
        source: StoreError,
    },
}

impl TourneyError {
    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TourneyError::NotFound(_) => ErrorKind::NotFound,
            TourneyError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            TourneyError::AlreadyEnrolled { .. } => ErrorKind::AlreadyEnrolled,
            TourneyError::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
            TourneyError::TournamentClosed(_) => ErrorKind::TournamentClosed,
            TourneyError::AlreadyFinished(_) => ErrorKind::AlreadyFinished,
            TourneyError::NoData => ErrorKind::NoData,
            TourneyError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            TourneyError::InvalidId(_) => ErrorKind::InvalidId,
            TourneyError::Overflow(_) => ErrorKind::Overflow,
            TourneyError::ConcurrencyConflict { .. } => ErrorKind::ConcurrencyConflict,
            TourneyError::Storage { .. } => ErrorKind::Storage,
        }
    }

    /// Whether running the whole unit of work again may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, TourneyError::ConcurrencyConflict { .. })
    }

    /// Wrap a backend error. Conflicts become [`TourneyError::ConcurrencyConflict`]
    /// so the retry loop can pick them up.
    pub fn storage(operation: &'static str, entity: Entity, source: StoreError) -> Self {
        if source.is_conflict() {
            TourneyError::ConcurrencyConflict {
                operation,
                attempts: 1,
            }
        } else {
            TourneyError::Storage {
                operation,
                entity,
                source,
            }
        }
    }

    /// Get a client-safe error message that doesn't leak backend details
    pub fn client_message(&self) -> String {
        match self {
            TourneyError::Storage { .. } => "Internal server error".to_string(),
            TourneyError::ConcurrencyConflict { .. } => {
                "Service busy, please retry".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Reject ids below 1
pub(crate) fn ensure_valid_id(entity: Entity) -> TourneyResult<()> {
    match entity {
        Entity::Player(id) | Entity::Tournament(id) if id < 1 => {
            Err(TourneyError::InvalidId(entity))
        }
        _ => Ok(()),
    }
}

/// Result type for settlement operations
pub type TourneyResult<T> = Result<T, TourneyError>;

/// Attach operation and entity context to store results
pub(crate) trait StoreResultExt<T> {
    fn context(self, operation: &'static str, entity: Entity) -> TourneyResult<T>;
}

impl<T> StoreResultExt<T> for Result<T, StoreError> {
    fn context(self, operation: &'static str, entity: Entity) -> TourneyResult<T> {
        self.map_err(|e| TourneyError::storage(operation, entity, e))
    }
}
