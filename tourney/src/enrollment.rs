//! Enrollment store: which players entered which tournament.
//!
//! Membership is a set. [`contains`] lets callers classify a repeat entry
//! early; the insert itself still detects duplicates, so two concurrent
//! enrollments of the same pair cannot both succeed.

use crate::errors::{Entity, StoreResultExt, TourneyError, TourneyResult};
use crate::ledger::PlayerId;
use crate::store::UnitOfWork;
use crate::tournament::TournamentId;

/// Record that `player_id` entered `tournament_id`
///
/// # Errors
///
/// * `TourneyError::AlreadyEnrolled` - Pair already recorded
pub async fn add(
    tx: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> TourneyResult<()> {
    let entity = Entity::Enrollment {
        tournament_id,
        player_id,
    };
    let inserted = tx
        .insert_enrollment(tournament_id, player_id)
        .await
        .context("enroll", entity)?;

    if inserted {
        Ok(())
    } else {
        Err(TourneyError::AlreadyEnrolled {
            tournament_id,
            player_id,
        })
    }
}

/// Whether `player_id` already entered `tournament_id`
pub async fn contains(
    tx: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> TourneyResult<bool> {
    tx.is_enrolled(tournament_id, player_id).await.context(
        "check enrollment",
        Entity::Enrollment {
            tournament_id,
            player_id,
        },
    )
}

/// Enrolled players of a tournament, ascending by id
pub async fn list_players(
    tx: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
) -> TourneyResult<Vec<PlayerId>> {
    tx.enrolled_players(tournament_id)
        .await
        .context("list enrolled players", Entity::Tournament(tournament_id))
}
