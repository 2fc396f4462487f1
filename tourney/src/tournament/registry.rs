//! Registry operations.

use super::models::{Tournament, TournamentId};
use crate::errors::{Entity, StoreResultExt, TourneyError, TourneyResult};
use crate::ledger::PlayerId;
use crate::store::UnitOfWork;

/// Create an open tournament with an empty pool
///
/// # Errors
///
/// * `TourneyError::InvalidAmount` - Negative deposit
/// * `TourneyError::AlreadyExists` - Id taken
pub async fn announce(
    tx: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    deposit: i64,
) -> TourneyResult<Tournament> {
    if deposit < 0 {
        return Err(TourneyError::InvalidAmount(format!(
            "deposit of {deposit} for tournament {tournament_id}"
        )));
    }

    let tournament = Tournament::announced(tournament_id, deposit);
    let inserted = tx
        .insert_tournament(&tournament)
        .await
        .context("announce", Entity::Tournament(tournament_id))?;
    if !inserted {
        return Err(TourneyError::AlreadyExists(Entity::Tournament(tournament_id)));
    }

    Ok(tournament)
}

/// Look up a tournament
pub async fn get(tx: &mut dyn UnitOfWork, tournament_id: TournamentId) -> TourneyResult<Tournament> {
    tx.tournament(tournament_id)
        .await
        .context("get tournament", Entity::Tournament(tournament_id))?
        .ok_or(TourneyError::NotFound(Entity::Tournament(tournament_id)))
}

/// Look up a tournament and hold its row lock until the unit of work ends
pub async fn get_for_update(
    tx: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
) -> TourneyResult<Tournament> {
    tx.tournament_for_update(tournament_id)
        .await
        .context("lock tournament", Entity::Tournament(tournament_id))?
        .ok_or(TourneyError::NotFound(Entity::Tournament(tournament_id)))
}

/// Replace the prize pool of an open tournament
///
/// # Errors
///
/// * `TourneyError::InvalidAmount` - Negative pool
/// * `TourneyError::TournamentClosed` - Tournament finished
/// * `TourneyError::NotFound` - Unknown tournament
pub async fn set_prize_pool(
    tx: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    new_amount: i64,
) -> TourneyResult<()> {
    if new_amount < 0 {
        return Err(TourneyError::InvalidAmount(format!(
            "prize pool of {new_amount} for tournament {tournament_id}"
        )));
    }

    let updated = tx
        .set_prize_pool(tournament_id, new_amount)
        .await
        .context("set prize pool", Entity::Tournament(tournament_id))?;
    if updated {
        return Ok(());
    }

    get(tx, tournament_id).await?;
    Err(TourneyError::TournamentClosed(tournament_id))
}

/// Pre-assign the winner of an open tournament
///
/// # Errors
///
/// * `TourneyError::NotFound` - Unknown tournament or player
/// * `TourneyError::AlreadyFinished` - Tournament finished
pub async fn assign_winner(
    tx: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    player_id: PlayerId,
) -> TourneyResult<Tournament> {
    let tournament = get_for_update(tx, tournament_id).await?;
    if tournament.is_finished() {
        return Err(TourneyError::AlreadyFinished(tournament_id));
    }

    tx.player(player_id)
        .await
        .context("assign winner", Entity::Player(player_id))?
        .ok_or(TourneyError::NotFound(Entity::Player(player_id)))?;

    let updated = tx
        .set_winner(tournament_id, player_id)
        .await
        .context("assign winner", Entity::Tournament(tournament_id))?;
    if !updated {
        return Err(TourneyError::AlreadyFinished(tournament_id));
    }

    Ok(Tournament {
        winner_id: Some(player_id),
        ..tournament
    })
}

/// Transition Open to Finished, recording the winner and the disbursed pool
///
/// # Errors
///
/// * `TourneyError::AlreadyFinished` - Another settlement got there first
/// * `TourneyError::NotFound` - Unknown tournament
pub async fn finish(
    tx: &mut dyn UnitOfWork,
    tournament_id: TournamentId,
    winner_id: Option<PlayerId>,
    prize_paid: i64,
) -> TourneyResult<()> {
    let finished = tx
        .mark_finished(tournament_id, winner_id, prize_paid)
        .await
        .context("finish", Entity::Tournament(tournament_id))?;
    if finished {
        return Ok(());
    }

    get(tx, tournament_id).await?;
    Err(TourneyError::AlreadyFinished(tournament_id))
}

/// All finished tournaments, oldest settlement first
pub async fn list_finished(tx: &mut dyn UnitOfWork) -> TourneyResult<Vec<Tournament>> {
    tx.finished_tournaments()
        .await
        .context("list finished tournaments", Entity::Store)
}
